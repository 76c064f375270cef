//! Operator/user facing output and the shared console input loop.

use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWriteExt},
    sync::{
        mpsc::{self, error::TryRecvError},
        oneshot,
    },
    task::JoinHandle,
};

#[derive(Debug)]
enum Entry {
    Line(String),
    Flush(oneshot::Sender<()>),
}

/// Display sink for console messages.
///
/// Lines are queued and printed by a single task, so output from the relay,
/// connection tasks and the console loop never interleaves mid-line.
#[derive(Debug, Clone)]
pub struct Console {
    tx: mpsc::UnboundedSender<Entry>,
}

impl Console {
    /// A console whose lines are handed to the returned receiver.
    pub fn channel() -> (Self, ConsoleLines) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, ConsoleLines { rx })
    }

    /// A console printing to stdout. Must be called inside a tokio runtime.
    pub fn stdout() -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let printer = tokio::spawn(async move {
            let mut stdout = io::stdout();
            while let Some(entry) = rx.recv().await {
                match entry {
                    Entry::Line(line) => {
                        if write_stdout(&mut stdout, &line).await.is_err() {
                            break;
                        }
                    }
                    Entry::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });
        (Self { tx }, printer)
    }

    pub fn display(&self, line: impl Into<String>) {
        // The printer only goes away at process exit.
        let _ = self.tx.send(Entry::Line(line.into()));
    }

    /// Resolves once every line displayed before this call has been written.
    pub async fn flush(&self) {
        let (done, written) = oneshot::channel();
        if self.tx.send(Entry::Flush(done)).is_ok() {
            let _ = written.await;
        }
    }
}

/// Receiving end of [`Console::channel`].
#[derive(Debug)]
pub struct ConsoleLines {
    rx: mpsc::UnboundedReceiver<Entry>,
}

impl ConsoleLines {
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await? {
                Entry::Line(line) => return Some(line),
                Entry::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<String, TryRecvError> {
        loop {
            match self.rx.try_recv()? {
                Entry::Line(line) => return Ok(line),
                Entry::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }
}

async fn write_stdout(stdout: &mut io::Stdout, line: &str) -> io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Something that reacts to console lines.
pub trait Interpreter {
    fn execute(&mut self, line: &str) -> impl Future<Output = Flow>;
}

/// Feeds lines from `input` to `interpreter` until it asks to quit or the
/// input ends. Returns the flow that ended the loop.
pub async fn run_console<R, I>(input: R, interpreter: &mut I) -> io::Result<Flow>
where
    R: AsyncBufRead + Unpin,
    I: Interpreter,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if interpreter.execute(&line).await == Flow::Quit {
            return Ok(Flow::Quit);
        }
    }
    Ok(Flow::Continue)
}
