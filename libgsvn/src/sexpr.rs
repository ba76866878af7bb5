//! The wire grammar (C2): a message is a whitespace-separated sequence of
//! tokens — `(`, `)`, non-negative decimal integers, length-prefixed byte
//! strings (`N:` followed by exactly `N` raw bytes), and lowercase-starting
//! atoms. Built entirely on [`crate::io::FramedReader`]/[`FramedWrite`] so
//! that a single byte of lookahead is all either direction ever needs.

use crate::error::{GsvnError, GsvnResult};
use crate::io::{FramedReader, FramedWrite};
use tokio::io::{AsyncRead, AsyncWrite};

const MAX_NUMBER_DIGITS: usize = 20;

enum Token {
    Open,
    Close,
    Number(u64),
    Atom(String),
    String(Vec<u8>),
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_atom_byte(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_')
}

pub struct SexprReader<R> {
    inner: FramedReader<R>,
}

impl<R: AsyncRead + Unpin> SexprReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner: FramedReader::new(inner) }
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    async fn skip_ws(&mut self) -> GsvnResult<()> {
        loop {
            match self.inner.read_byte().await? {
                Some(b) if is_ws(b) => continue,
                Some(b) => {
                    self.inner.unread_byte(b);
                    return Ok(());
                }
                None => return Ok(()),
            }
        }
    }

    async fn next_byte(&mut self) -> GsvnResult<u8> {
        self.inner
            .read_byte()
            .await?
            .ok_or_else(|| GsvnError::protocol("unexpected end of stream"))
    }

    async fn next_token(&mut self) -> GsvnResult<Token> {
        self.skip_ws().await?;
        let b = self.next_byte().await?;
        match b {
            b'(' => Ok(Token::Open),
            b')' => Ok(Token::Close),
            b'0'..=b'9' => {
                let mut digits = vec![b];
                loop {
                    let b = self.next_byte().await?;
                    if b.is_ascii_digit() {
                        digits.push(b);
                        if digits.len() > MAX_NUMBER_DIGITS {
                            return Err(GsvnError::protocol("numeric token too long"));
                        }
                    } else if b == b':' {
                        let s = std::str::from_utf8(&digits)
                            .ok()
                            .and_then(|s| s.parse::<usize>().ok())
                            .ok_or_else(|| GsvnError::protocol("invalid string length"))?;
                        let bytes = self.inner.read_exact_n(s).await?;
                        return Ok(Token::String(bytes));
                    } else {
                        self.inner.unread_byte(b);
                        let n = std::str::from_utf8(&digits)
                            .ok()
                            .and_then(|s| s.parse::<u64>().ok())
                            .ok_or_else(|| GsvnError::protocol("invalid numeric token"))?;
                        return Ok(Token::Number(n));
                    }
                }
            }
            b if is_atom_byte(b) => {
                let mut atom = vec![b];
                loop {
                    let b = self.next_byte().await?;
                    if is_atom_byte(b) {
                        atom.push(b);
                    } else {
                        self.inner.unread_byte(b);
                        break;
                    }
                }
                let atom = String::from_utf8(atom)
                    .map_err(|_| GsvnError::protocol("non-utf8 atom"))?;
                Ok(Token::Atom(atom))
            }
            _ => Err(GsvnError::protocol(format!("unexpected byte 0x{:02x}", b))),
        }
    }

    /// consume whitespace until `(`; fail if another token appears first
    pub async fn read_list(&mut self) -> GsvnResult<()> {
        match self.next_token().await? {
            Token::Open => Ok(()),
            _ => Err(GsvnError::protocol("expected list open")),
        }
    }

    pub async fn read_number(&mut self) -> GsvnResult<u64> {
        match self.next_token().await? {
            Token::Number(n) => Ok(n),
            _ => Err(GsvnError::protocol("expected number")),
        }
    }

    pub async fn read_atom(&mut self) -> GsvnResult<String> {
        match self.next_token().await? {
            Token::Atom(a) => Ok(a),
            _ => Err(GsvnError::protocol("expected atom")),
        }
    }

    pub async fn read_string(&mut self) -> GsvnResult<Vec<u8>> {
        match self.next_token().await? {
            Token::String(s) => Ok(s),
            _ => Err(GsvnError::protocol("expected string")),
        }
    }

    /// if the next token is `)`, consume it and return `false` (absent);
    /// otherwise leave the stream positioned and return `true` (present)
    pub async fn read_optional(&mut self) -> GsvnResult<bool> {
        self.skip_ws().await?;
        let b = self.next_byte().await?;
        if b == b')' {
            Ok(false)
        } else {
            self.inner.unread_byte(b);
            Ok(true)
        }
    }

    /// true if the next token is `(`, without consuming anything; used by
    /// streaming replies (`log`, `get-file-revs`, ...) whose items are bare
    /// lists terminated by a literal `done` atom rather than a `)`
    pub async fn peek_is_list(&mut self) -> GsvnResult<bool> {
        self.skip_ws().await?;
        let b = self.next_byte().await?;
        self.inner.unread_byte(b);
        Ok(b == b'(')
    }

    /// skip tokens, balancing parens, until the enclosing list closes.
    /// strings are length-counted as part of tokenizing, so their raw
    /// bytes (which may contain `(` or `)`) never confuse the balance.
    pub async fn read_end(&mut self) -> GsvnResult<()> {
        let mut depth = 1i32;
        while depth > 0 {
            match self.next_token().await? {
                Token::Open => depth += 1,
                Token::Close => depth -= 1,
                Token::Number(_) | Token::Atom(_) | Token::String(_) => {}
            }
        }
        Ok(())
    }
}

pub struct SexprWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin + Send> SexprWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub async fn write_list(&mut self) -> GsvnResult<()> {
        self.inner.write_all_or_fail(b"( ").await?;
        Ok(())
    }

    pub async fn write_list_end(&mut self) -> GsvnResult<()> {
        self.inner.write_all_or_fail(b") ").await?;
        Ok(())
    }

    pub async fn write_number(&mut self, n: u64) -> GsvnResult<()> {
        self.inner.write_all_or_fail(format!("{} ", n).as_bytes()).await?;
        Ok(())
    }

    pub async fn write_atom(&mut self, atom: &str) -> GsvnResult<()> {
        debug_assert!(atom.bytes().all(is_atom_byte));
        self.inner.write_all_or_fail(format!("{} ", atom).as_bytes()).await?;
        Ok(())
    }

    pub async fn write_string(&mut self, bytes: &[u8]) -> GsvnResult<()> {
        self.inner.write_all_or_fail(format!("{}:", bytes.len()).as_bytes()).await?;
        self.inner.write_all_or_fail(bytes).await?;
        self.inner.write_all_or_fail(b" ").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
