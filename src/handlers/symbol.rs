use std::io;

use axum::body::Body;
use axum::http::{header, Method};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;

use super::data::{Service, CONTENT_TYPE_TEXT};
use crate::runtime::SymbolResolver;

/// Header expected by pprof clients. The count is fixed, not computed.
pub const NUM_SYMBOLS: &str = "num_symbols: 1\n";

pub async fn handler(srv: &Service, method: &Method, query: Option<&str>, body: Body) -> Response {
    let resolver = srv.runtime.symbols.as_ref();
    let res = if method == Method::POST {
        let stream = body.into_data_stream().map_err(io::Error::other);
        symbolize(StreamReader::new(Box::pin(stream)), resolver).await
    } else {
        symbolize(query.unwrap_or_default().as_bytes(), resolver).await
    };
    ([(header::CONTENT_TYPE, CONTENT_TYPE_TEXT)], res).into_response()
}

/// Resolves a `+` separated list of addresses, one `<addr> <function>` line
/// per resolved address. Zero, unknown and malformed addresses are skipped.
pub async fn symbolize<R>(mut reader: R, resolver: &dyn SymbolResolver) -> Vec<u8>
where
    R: AsyncBufRead + Unpin,
{
    let mut res = NUM_SYMBOLS.as_bytes().to_vec();
    let mut word = Vec::new();
    loop {
        word.clear();
        match reader.read_until(b'+', &mut word).await {
            Ok(_) => {
                let more = word.last() == Some(&b'+');
                if more {
                    word.pop();
                }
                resolve_word(&word, resolver, &mut res);
                if !more {
                    break;
                }
            }
            Err(err) => {
                resolve_word(&word, resolver, &mut res);
                res.extend_from_slice(format!("reading request: {err}\n").as_bytes());
                break;
            }
        }
    }
    res
}

fn resolve_word(word: &[u8], resolver: &dyn SymbolResolver, res: &mut Vec<u8>) {
    let Some(addr) = std::str::from_utf8(word).ok().and_then(parse_address) else {
        return;
    };
    if addr == 0 {
        return;
    }
    if let Some(name) = resolver.resolve(addr) {
        res.extend_from_slice(format!("{addr:#x} {name}\n").as_bytes());
    }
}

/// Parses an unsigned integer literal: `0x`/`0o`/`0b` prefixes, a leading
/// `0` for octal, decimal otherwise. Underscores may separate digits.
pub fn parse_address(word: &str) -> Option<u64> {
    let (digits, radix, prefixed) = match word.as_bytes() {
        [b'0', b'x' | b'X', ..] => (&word[2..], 16, true),
        [b'0', b'o' | b'O', ..] => (&word[2..], 8, true),
        [b'0', b'b' | b'B', ..] => (&word[2..], 2, true),
        [b'0', _, ..] => (&word[1..], 8, true),
        _ => (word, 10, false),
    };
    if digits.contains('_')
        && (digits.ends_with('_') || digits.contains("__") || (!prefixed && digits.starts_with('_')))
    {
        return None;
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    u64::from_str_radix(&cleaned, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::FakeResolver;
    use pretty_assertions::assert_eq;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    fn _test_parse(word: &str, expected: Option<u64>) {
        assert_eq!(parse_address(word), expected, "{}", word);
    }

    #[test]
    fn test_parse_address() {
        _test_parse("0", Some(0));
        _test_parse("42", Some(42));
        _test_parse("0x2a", Some(42));
        _test_parse("0X2A", Some(42));
        _test_parse("052", Some(42));
        _test_parse("0o52", Some(42));
        _test_parse("0b101010", Some(42));
        _test_parse("1_000", Some(1000));
        _test_parse("0x_2a", Some(42));
        _test_parse("_1", None);
        _test_parse("1_", None);
        _test_parse("1__0", None);
        _test_parse("08", None);
        _test_parse("0x", None);
        _test_parse("", None);
        _test_parse("abc", None);
        _test_parse("-1", None);
        _test_parse("+1", None);
        _test_parse("0x+1", None);
        _test_parse("18446744073709551616", None);
    }

    fn resolver() -> FakeResolver {
        FakeResolver([(0x4010f0, "main::work".to_string())].into_iter().collect())
    }

    #[tokio::test]
    async fn test_symbolize() {
        let input = format!("0x0+abc+{:#x}+0x2a", 0x4010f0);
        let res = symbolize(input.as_bytes(), &resolver()).await;
        assert_eq!(
            String::from_utf8(res).unwrap(),
            "num_symbols: 1\n0x4010f0 main::work\n"
        );
    }

    #[tokio::test]
    async fn test_symbolize_decimal_and_empty() {
        let res = symbolize(&b"4198640++"[..], &resolver()).await;
        assert_eq!(
            String::from_utf8(res).unwrap(),
            "num_symbols: 1\n0x4010f0 main::work\n"
        );
        let res = symbolize(&b""[..], &resolver()).await;
        assert_eq!(String::from_utf8(res).unwrap(), "num_symbols: 1\n");
    }

    /// Yields `data` once, then fails.
    struct Failing {
        data: Option<&'static [u8]>,
    }

    impl AsyncRead for Failing {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.data.take() {
                Some(data) => {
                    buf.put_slice(data);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(io::Error::other("connection reset"))),
            }
        }
    }

    #[tokio::test]
    async fn test_symbolize_read_error() {
        let reader = tokio::io::BufReader::new(Failing {
            data: Some(b"0x4010f0+0x1"),
        });
        let res = symbolize(reader, &resolver()).await;
        assert_eq!(
            String::from_utf8(res).unwrap(),
            "num_symbols: 1\n0x4010f0 main::work\nreading request: connection reset\n"
        );
    }
}
