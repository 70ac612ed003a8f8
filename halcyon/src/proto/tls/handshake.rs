use std::io::{Read, Write};

use bytes::{BufMut, BytesMut};
use rand::RngCore;

use crate::observe::SharedObserver;
use crate::proto::tls::record::{ContentType, RecordHead, RECORD_HEADER_LEN, VERSION_TLS10, VERSION_TLS12};
use crate::proto::tls::{TlsConfig, TlsError};

const HANDSHAKE_CLIENT_HELLO: u8 = 1;
const HANDSHAKE_SERVER_HELLO: u8 = 2;

const ALERT_HANDSHAKE_FAILURE: u8 = 40;

// Approved suites, preference order.
const CIPHER_SUITES: [u16; 5] = [
    0x1301, // TLS_AES_128_GCM_SHA256
    0x1302, // TLS_AES_256_GCM_SHA384
    0xc02b, // TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
    0xc02f, // TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
    0xc030, // TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384
];

const EXT_SERVER_NAME: u16 = 0;
const EXT_SUPPORTED_GROUPS: u16 = 10;
const EXT_EC_POINT_FORMATS: u16 = 11;
const EXT_SIGNATURE_ALGORITHMS: u16 = 13;
const EXT_ALPN: u16 = 16;

const SUPPORTED_GROUPS: [u16; 3] = [
    0x001d, // x25519
    0x0017, // secp256r1
    0x0018, // secp384r1
];

const SIGNATURE_ALGORITHMS: [u16; 6] = [
    0x0403, // ecdsa_secp256r1_sha256
    0x0503, // ecdsa_secp384r1_sha384
    0x0804, // rsa_pss_rsae_sha256
    0x0805, // rsa_pss_rsae_sha384
    0x0401, // rsa_pkcs1_sha256
    0x0501, // rsa_pkcs1_sha384
];

// The one protocol this client speaks.
const ALPN_PROTOCOL: &[u8] = b"h2";

/// Send the ClientHello, then read server records until a ServerHello or a
/// terminal alert is observed.
pub(crate) fn run<S: Read + Write>(
    channel: &mut S,
    server_name: &str,
    config: &TlsConfig,
    observer: &SharedObserver,
) -> Result<(), TlsError> {
    let hello = client_hello(server_name);
    channel.write_all(&hello)?;
    channel.flush()?;
    observer.trace(format_args!(
        "tls: client hello sent; server_name={}; len={}",
        server_name,
        hello.len()
    ));

    let mut payload = vec![0u8; config.max_record_len];
    loop {
        let mut header = [0u8; RECORD_HEADER_LEN];
        channel.read_exact(&mut header)?;
        let head = RecordHead::parse(&header);

        if head.len as usize > config.max_record_len {
            return Err(TlsError::RecordOverflow {
                len: head.len as usize,
                max: config.max_record_len,
            });
        }
        let payload = &mut payload[..head.len as usize];
        channel.read_exact(payload)?;

        match head.content_type {
            ContentType::Handshake => {
                if !payload.is_empty() && payload[0] == HANDSHAKE_SERVER_HELLO {
                    observer.trace(format_args!("tls: server hello; len={}", head.len));
                    return Ok(());
                }
                observer.trace(format_args!(
                    "tls: skipping handshake message; type={}",
                    payload.first().copied().unwrap_or(0)
                ));
            }
            ContentType::Alert => {
                let (level, description) = match payload {
                    [level, description, ..] => (*level, *description),
                    _ => (0, 0),
                };
                if description == ALERT_HANDSHAKE_FAILURE && config.tolerate_handshake_failure {
                    observer.warn(format_args!(
                        "tls: tolerating handshake_failure alert; session is degraded"
                    ));
                    return Ok(());
                }
                return Err(TlsError::AlertReceived { level, description });
            }
            other => {
                observer.trace(format_args!(
                    "tls: skipping record; content_type={}",
                    other.as_byte()
                ));
            }
        }
    }
}

/// One handshake record wrapping the ClientHello message.
fn client_hello(server_name: &str) -> BytesMut {
    let mut random = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random);

    let mut body = BytesMut::with_capacity(256);
    body.put_u16(VERSION_TLS12);
    body.put_slice(&random);
    body.put_u8(0); // empty session id
    body.put_u16((CIPHER_SUITES.len() * 2) as u16);
    for suite in CIPHER_SUITES.iter() {
        body.put_u16(*suite);
    }
    body.put_u8(1); // one compression method:
    body.put_u8(0); // null

    let extensions = extensions(server_name);
    body.put_u16(extensions.len() as u16);
    body.put_slice(&extensions);

    let mut message = BytesMut::with_capacity(body.len() + 4);
    message.put_u8(HANDSHAKE_CLIENT_HELLO);
    message.put_uint(body.len() as u64, 3);
    message.put_slice(&body);

    let mut out = BytesMut::with_capacity(message.len() + RECORD_HEADER_LEN);
    RecordHead {
        content_type: ContentType::Handshake,
        version: VERSION_TLS10,
        len: message.len() as u16,
    }
    .encode(&mut out);
    out.put_slice(&message);
    out
}

fn extensions(server_name: &str) -> BytesMut {
    let mut out = BytesMut::with_capacity(128);

    // server_name: one host_name entry.
    let name = server_name.as_bytes();
    extension(&mut out, EXT_SERVER_NAME, |ext| {
        ext.put_u16((name.len() + 3) as u16);
        ext.put_u8(0); // host_name
        ext.put_u16(name.len() as u16);
        ext.put_slice(name);
    });

    extension(&mut out, EXT_SUPPORTED_GROUPS, |ext| {
        ext.put_u16((SUPPORTED_GROUPS.len() * 2) as u16);
        for group in SUPPORTED_GROUPS.iter() {
            ext.put_u16(*group);
        }
    });

    extension(&mut out, EXT_EC_POINT_FORMATS, |ext| {
        ext.put_u8(1);
        ext.put_u8(0); // uncompressed
    });

    extension(&mut out, EXT_SIGNATURE_ALGORITHMS, |ext| {
        ext.put_u16((SIGNATURE_ALGORITHMS.len() * 2) as u16);
        for alg in SIGNATURE_ALGORITHMS.iter() {
            ext.put_u16(*alg);
        }
    });

    extension(&mut out, EXT_ALPN, |ext| {
        ext.put_u16((ALPN_PROTOCOL.len() + 1) as u16);
        ext.put_u8(ALPN_PROTOCOL.len() as u8);
        ext.put_slice(ALPN_PROTOCOL);
    });

    out
}

fn extension<F>(dst: &mut BytesMut, id: u16, f: F)
where
    F: FnOnce(&mut BytesMut),
{
    let mut body = BytesMut::with_capacity(64);
    f(&mut body);
    dst.put_u16(id);
    dst.put_u16(body.len() as u16);
    dst.put_slice(&body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::noop_observer;
    use std::io::{self, Cursor};

    // One end scripted: reads come from `input`, writes land in `written`.
    struct Pipe {
        input: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Read for Pipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Pipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record(content_type: ContentType, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        RecordHead {
            content_type,
            version: VERSION_TLS12,
            len: payload.len() as u16,
        }
        .encode(&mut out);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn completes_on_server_hello() {
        let mut input = record(ContentType::ChangeCipherSpec, &[1]);
        input.extend(record(ContentType::Handshake, &[HANDSHAKE_SERVER_HELLO, 0, 0, 10]));
        let mut pipe = Pipe {
            input: Cursor::new(input),
            written: Vec::new(),
        };

        run(&mut pipe, "node0.example.net", &TlsConfig::default(), &noop_observer()).unwrap();

        // The ClientHello went out as one handshake record.
        let head = RecordHead::parse(&pipe.written);
        assert_eq!(head.content_type, ContentType::Handshake);
        assert_eq!(head.len as usize, pipe.written.len() - RECORD_HEADER_LEN);
        assert_eq!(pipe.written[RECORD_HEADER_LEN], HANDSHAKE_CLIENT_HELLO);
    }

    #[test]
    fn client_hello_advertises_sni_and_alpn() {
        let hello = client_hello("ledger.example.net");
        let hello = &hello[..];
        let needle = b"ledger.example.net";
        assert!(hello.windows(needle.len()).any(|w| w == needle));
        assert!(hello.windows(3).any(|w| w == [2, b'h', b'2']));
    }

    #[test]
    fn alert_is_an_error_by_default() {
        let input = record(ContentType::Alert, &[2, ALERT_HANDSHAKE_FAILURE]);
        let mut pipe = Pipe {
            input: Cursor::new(input),
            written: Vec::new(),
        };

        match run(&mut pipe, "n", &TlsConfig::default(), &noop_observer()) {
            Err(TlsError::AlertReceived { level: 2, description }) => {
                assert_eq!(description, ALERT_HANDSHAKE_FAILURE)
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn degraded_mode_tolerates_handshake_failure() {
        let input = record(ContentType::Alert, &[2, ALERT_HANDSHAKE_FAILURE]);
        let mut pipe = Pipe {
            input: Cursor::new(input),
            written: Vec::new(),
        };
        let config = TlsConfig {
            tolerate_handshake_failure: true,
            ..TlsConfig::default()
        };

        run(&mut pipe, "n", &config, &noop_observer()).unwrap();
    }

    #[test]
    fn oversized_record_is_fatal() {
        let mut input = Vec::new();
        RecordHead {
            content_type: ContentType::Handshake,
            version: VERSION_TLS12,
            len: u16::MAX,
        }
        .encode(&mut input);
        let mut pipe = Pipe {
            input: Cursor::new(input),
            written: Vec::new(),
        };

        match run(&mut pipe, "n", &TlsConfig::default(), &noop_observer()) {
            Err(TlsError::RecordOverflow { len, .. }) => assert_eq!(len, u16::MAX as usize),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
