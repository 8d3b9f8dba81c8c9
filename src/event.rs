use std::io::{BufRead, BufReader};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub enum AppEvent {
    Line(String),
    Tick,
    Eof,
}

/// Merges stdin lines and a periodic tick into one channel.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self::from_reader(BufReader::new(std::io::stdin()), tick_rate)
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R, tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(AppEvent::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            let _ = tx.send(AppEvent::Eof);
        });

        Self { rx, tick_rate }
    }

    /// Next line or EOF, or a Tick when nothing arrived within the tick rate.
    pub fn next(&self) -> AppEvent {
        match self.rx.recv_timeout(self.tick_rate) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => AppEvent::Tick,
            Err(mpsc::RecvTimeoutError::Disconnected) => AppEvent::Eof,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn delivers_lines_then_eof() {
        let events = EventHandler::from_reader(Cursor::new("ni 3\n:next\n"), Duration::from_secs(5));
        assert!(matches!(events.next(), AppEvent::Line(l) if l == "ni 3"));
        assert!(matches!(events.next(), AppEvent::Line(l) if l == ":next"));
        assert!(matches!(events.next(), AppEvent::Eof));
    }
}
