use std::io::{self, BufRead, BufReader, Read};

/// Incremental line iterator over a child process pipe.
///
/// ffmpeg ends ordinary log lines with `\n` but rewrites progress lines in
/// place with a bare `\r`, so `\n`, `\r\n` and `\r` all delimit lines here.
/// The stream must be valid UTF-8; undecodable bytes surface as an
/// `InvalidData` error, which callers treat like any other read failure.
pub struct LineSource<R: Read> {
    reader: BufReader<R>,
    pending_lf: bool,
    done: bool,
}

impl<R: Read> LineSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending_lf: false,
            done: false,
        }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        loop {
            let available = match self.reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if available.is_empty() {
                self.done = true;
                if buf.is_empty() {
                    return Ok(None);
                }
                return decode(buf).map(Some);
            }

            // A `\r\n` ending may be split across reads; drop the dangling `\n`.
            if self.pending_lf {
                self.pending_lf = false;
                if available[0] == b'\n' {
                    self.reader.consume(1);
                    continue;
                }
            }

            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(i) => {
                    let ending = available[i];
                    buf.extend_from_slice(&available[..i]);
                    self.reader.consume(i + 1);
                    self.pending_lf = ending == b'\r';
                    return decode(buf).map(Some);
                }
                None => {
                    let len = available.len();
                    buf.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }
    }
}

fn decode(buf: Vec<u8>) -> io::Result<String> {
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

impl<R: Read> Iterator for LineSource<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
