use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::{Instant, Sleep, sleep_until};

pin_project! {
    /// A reader failing with [`io::ErrorKind::TimedOut`] when it stalls.
    ///
    /// Two limits are checked on every read:
    /// - the idle timeout, restarted whenever bytes arrive
    /// - an optional absolute deadline, set per request by the connection
    #[derive(Debug)]
    pub struct TimeoutReader<R> {
        #[pin]
        inner: R,
        idle_timeout: Option<Duration>,
        deadline: Option<Instant>,
        timer: Pin<Box<Sleep>>,
        armed: bool,
    }
}

impl<R: AsyncRead> TimeoutReader<R> {
    pub fn new(inner: R, idle_timeout: Option<Duration>) -> Self {
        Self { inner, idle_timeout, deadline: None, timer: Box::pin(sleep_until(Instant::now())), armed: false }
    }

    pub fn set_idle_timeout(&mut self, idle_timeout: Option<Duration>) {
        self.idle_timeout = idle_timeout;
        self.armed = false;
    }

    /// Sets the absolute point in time after which every read fails.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
        self.armed = false;
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead> AsyncRead for TimeoutReader<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.project();

        if let Some(deadline) = *this.deadline
            && Instant::now() >= deadline
        {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, "request exceeded its maximum time")));
        }

        match this.inner.poll_read(cx, buf) {
            Poll::Ready(result) => {
                *this.armed = false;
                Poll::Ready(result)
            }
            Poll::Pending => {
                let limit = match (*this.idle_timeout, *this.deadline) {
                    (Some(idle), Some(deadline)) => Some(deadline.min(Instant::now() + idle)),
                    (Some(idle), None) => Some(Instant::now() + idle),
                    (None, deadline) => deadline,
                };
                let Some(limit) = limit else {
                    return Poll::Pending;
                };

                if !*this.armed {
                    this.timer.as_mut().reset(limit);
                    *this.armed = true;
                }

                match this.timer.as_mut().poll(cx) {
                    Poll::Ready(()) => {
                        *this.armed = false;
                        Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }
}
