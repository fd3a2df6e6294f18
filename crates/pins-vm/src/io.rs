//! Input helpers for the read services.

use std::io::BufRead;

use crate::error::{VmError, VmResult};

/// Read one whitespace-delimited token.
pub fn read_token<R: BufRead>(input: &mut R) -> VmResult<String> {
    let mut token = Vec::new();
    loop {
        let buf = input.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let mut used = 0;
        let mut done = false;
        for &byte in buf {
            if byte.is_ascii_whitespace() {
                if !token.is_empty() {
                    done = true;
                    break;
                }
            } else {
                token.push(byte);
            }
            used += 1;
        }
        input.consume(used);
        if done {
            break;
        }
    }
    if token.is_empty() {
        return Err(VmError::EndOfInput);
    }
    String::from_utf8(token).map_err(|e| VmError::BadInput(e.to_string()))
}

/// Read one integer token.
pub fn read_int<R: BufRead>(input: &mut R) -> VmResult<i32> {
    let token = read_token(input)?;
    token.parse().map_err(|_| VmError::BadInput(token))
}

/// Read one line without its terminator.
pub fn read_line<R: BufRead>(input: &mut R) -> VmResult<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(VmError::EndOfInput);
    }
    while line.ends_with(['\n', '\r']) {
        line.pop();
    }
    Ok(line)
}
