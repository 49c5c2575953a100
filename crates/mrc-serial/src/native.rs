//! 基于 `serialport` 的串口实现

use crate::{Connector, Link, LinkError, LinkSettings};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 串口链路
///
/// 打开时配置为 8N1、无流控，并拉低 RTS（控制器接口板的要求）。
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
    #[cfg(unix)]
    fd: std::os::unix::io::RawFd,
}

impl SerialLink {
    pub fn open(name: &str, settings: LinkSettings) -> Result<Self, LinkError> {
        let builder = serialport::new(name, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.timeout);

        #[cfg(unix)]
        let (mut port, fd) = {
            use std::os::unix::io::AsRawFd;
            let native = builder
                .open_native()
                .map_err(|e| LinkError::unavailable(name, e))?;
            let fd = native.as_raw_fd();
            (Box::new(native) as Box<dyn SerialPort>, fd)
        };

        #[cfg(not(unix))]
        let mut port = builder
            .open()
            .map_err(|e| LinkError::unavailable(name, e))?;

        port.write_request_to_send(false)
            .map_err(|e| LinkError::unavailable(name, e))?;

        info!(
            "Opened serial port {} at {} baud (RTS deasserted)",
            name, settings.baud_rate
        );

        Ok(Self {
            port,
            name: name.to_string(),
            #[cfg(unix)]
            fd,
        })
    }
}

impl Link for SerialLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.port.write_all(bytes).map_err(LinkError::Write)?;
        self.port.flush().map_err(LinkError::Write)
    }

    fn read_until(&mut self, terminator: u8, timeout: Duration) -> Result<Vec<u8>, LinkError> {
        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.port.set_timeout(remaining).map_err(io::Error::from)?;

            match self.port.read(&mut byte) {
                Ok(0) => return Err(LinkError::Closed("end of stream".into())),
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == terminator {
                        break;
                    }
                },
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    break;
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Closed(e.to_string())),
            }
        }

        if !line.is_empty() && line.last() != Some(&terminator) {
            debug!("Partial read from {}: {} bytes", self.name, line.len());
        }
        Ok(line)
    }

    fn bytes_pending(&mut self) -> Result<usize, LinkError> {
        let n = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(n as usize)
    }

    #[cfg(unix)]
    fn raw_fd(&self) -> Option<std::os::unix::io::RawFd> {
        Some(self.fd)
    }
}

/// 串口连接器
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector {
    settings: LinkSettings,
}

impl SerialConnector {
    pub fn new(settings: LinkSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> LinkSettings {
        self.settings
    }
}

impl Connector for SerialConnector {
    type Link = SerialLink;

    fn open(&mut self, port: &str) -> Result<SerialLink, LinkError> {
        SerialLink::open(port, self.settings)
    }
}
