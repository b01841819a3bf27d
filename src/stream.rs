//! Byte stream access to compensated samples.
//!
//! Every sample is a frame of [`FRAME_LEN`] bytes, see
//! [`CompensatedReading::to_le_bytes`](crate::CompensatedReading::to_le_bytes).
//! A read never crosses a frame boundary: once the current frame is consumed the
//! next read takes a fresh measurement.

use embedded_hal::delay::DelayNs;
use embedded_io::{ErrorType, Read};

use crate::bus::BusClient;
use crate::session::{DeviceSession, State};
use crate::Error;

/// Length of one sample on the stream
pub const FRAME_LEN: usize = 12;

/// [`embedded_io::Read`] on top of a [`DeviceSession`]
pub struct SensorStream<B, D> {
    session: DeviceSession<B, D>,
    frame: [u8; FRAME_LEN],
    /// Bytes of `frame` already handed out
    pos: usize,
}

impl<B, D> SensorStream<B, D>
where
    B: BusClient,
    D: DelayNs,
{
    pub fn new(session: DeviceSession<B, D>) -> SensorStream<B, D> {
        SensorStream {
            session,
            frame: [0; FRAME_LEN],
            pos: FRAME_LEN,
        }
    }

    /// Attaches the session unless it is attached already.
    pub fn open(&mut self) -> Result<(), Error<B::Error>> {
        match self.session.state() {
            State::Uninitialized => self.session.attach(),
            State::Ready => Ok(()),
            state => Err(Error::InvalidState(state)),
        }
    }

    /// Drops a partially read frame and detaches the session.
    pub fn close(&mut self) -> Result<(), Error<B::Error>> {
        self.pos = FRAME_LEN;
        self.session.detach()
    }

    pub fn session(&self) -> &DeviceSession<B, D> {
        &self.session
    }

    pub fn into_session(self) -> DeviceSession<B, D> {
        self.session
    }
}

impl<B, D> ErrorType for SensorStream<B, D>
where
    B: BusClient,
{
    type Error = Error<B::Error>;
}

impl<B, D> Read for SensorStream<B, D>
where
    B: BusClient,
    D: DelayNs,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos == FRAME_LEN {
            let reading = self.session.measure()?;
            self.frame = reading.to_le_bytes();
            self.pos = 0;
        }

        let len = buf.len().min(FRAME_LEN - self.pos);
        buf[..len].copy_from_slice(&self.frame[self.pos..self.pos + len]);
        self.pos += len;
        Ok(len)
    }
}
