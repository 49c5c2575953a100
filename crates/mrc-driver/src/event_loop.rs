//! 单线程事件循环
//!
//! 用 `mio` 同时等待控制通道与串口链路两个输入源：
//!
//! - 控制通道可读：读入可用字节，每轮处理一条完整的行
//! - 链路可读：做一次有界读取，识别完成确认
//! - 两者都空闲：按 `poll_interval` 超时醒来检查退出标志
//!
//! `mio` 为边沿触发，每次处理完一个输入源后都会 `reregister`，
//! 使内核中剩余的数据重新产生就绪事件。

use crate::error::SessionError;
use crate::session::Session;
use mio::unix::SourceFd;
use mio::unix::pipe::Receiver;
use mio::{Events, Interest, Poll, Token};
use mrc_serial::Connector;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, FromRawFd, IntoRawFd};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

const CONTROL: Token = Token(0);
const LINK: Token = Token(1);

/// 单次从控制通道读取的最大字节数
const READ_CHUNK: usize = 4096;

/// 非阻塞的标准输入
///
/// 复制 stdin 的描述符并设置 `O_NONBLOCK`，drop 时恢复阻塞模式。
pub struct NonBlockingStdin {
    inner: Receiver,
}

impl NonBlockingStdin {
    pub fn new() -> io::Result<Self> {
        let owned = io::stdin().as_fd().try_clone_to_owned()?;
        // SAFETY: `owned` 是刚复制出的独占描述符，所有权转移给 Receiver
        let inner = unsafe { Receiver::from_raw_fd(owned.into_raw_fd()) };
        inner.set_nonblocking(true)?;
        Ok(Self { inner })
    }
}

impl Read for NonBlockingStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl AsRawFd for NonBlockingStdin {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl Drop for NonBlockingStdin {
    fn drop(&mut self) {
        // 与终端共享文件状态
        if let Err(e) = self.inner.set_nonblocking(false) {
            debug!("Failed to restore blocking stdin: {}", e);
        }
    }
}

/// 行累积的控制通道
///
/// 每次 [`fill`](Self::fill) 只做一次读取，完整的行进入队列，
/// 没有换行符的尾部保留到下一次读取。源必须是非阻塞的，
/// 否则没有换行符的半行会阻塞整个事件循环。
pub struct ControlChannel<R: Read + AsRawFd> {
    source: R,
    fd: RawFd,
    pending: Vec<u8>,
    lines: VecDeque<String>,
    eof: bool,
}

impl<R: Read + AsRawFd> ControlChannel<R> {
    pub fn new(source: R) -> Self {
        let fd = source.as_raw_fd();
        Self {
            source,
            fd,
            pending: Vec::new(),
            lines: VecDeque::new(),
            eof: false,
        }
    }

    /// 读取当前可用的字节
    ///
    /// `WouldBlock` 不是错误。EOF 时没有换行符的尾部作为最后一行交出。
    pub fn fill(&mut self) -> io::Result<()> {
        if self.eof {
            return Ok(());
        }

        let mut buf = [0u8; READ_CHUNK];
        loop {
            match self.source.read(&mut buf) {
                Ok(0) => {
                    self.eof = true;
                    if !self.pending.is_empty() {
                        let tail = std::mem::take(&mut self.pending);
                        self.lines.push_back(String::from_utf8_lossy(&tail).into_owned());
                    }
                    return Ok(());
                },
                Ok(n) => {
                    self.pending.extend_from_slice(&buf[..n]);
                    self.split_lines();
                    return Ok(());
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn split_lines(&mut self) {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.lines
                .push_back(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
    }

    /// 取出下一条完整的行（不含换行符）
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// 是否有已读入但未处理的完整行
    pub fn has_buffered(&self) -> bool {
        !self.lines.is_empty()
    }

    /// 尚未收到换行符的字节数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 源已 EOF 且所有行都已取出
    pub fn is_closed(&self) -> bool {
        self.eof && self.lines.is_empty()
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

/// 事件循环退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// 控制通道 EOF
    ControlClosed,
    /// 收到关闭信号
    Shutdown,
}

/// 事件循环
pub struct EventLoop {
    poll: Poll,
    events: Events,
    poll_interval: Duration,
    /// 控制通道无法注册（如普通文件）时视为始终可读
    control_registered: bool,
    /// 当前注册的链路 (fd, epoch)
    link_registration: Option<(RawFd, u64)>,
}

impl EventLoop {
    pub fn new(poll_interval: Duration) -> Result<Self, SessionError> {
        Ok(Self {
            poll: Poll::new().map_err(SessionError::Poll)?,
            events: Events::with_capacity(8),
            poll_interval,
            control_registered: false,
            link_registration: None,
        })
    }

    /// 运行直到控制通道关闭或 `shutdown` 被置位
    pub fn run<C, W, R>(
        &mut self,
        session: &mut Session<C, W>,
        control: &mut ControlChannel<R>,
        shutdown: &AtomicBool,
    ) -> Result<ExitReason, SessionError>
    where
        C: Connector,
        W: Write,
        R: Read + AsRawFd,
    {
        self.register_control(control.fd());

        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested");
                return Ok(ExitReason::Shutdown);
            }

            self.sync_link(session);

            let busy = control.has_buffered() || session.link_has_pending();
            let timeout = if busy || !self.control_registered {
                Duration::ZERO
            } else {
                self.poll_interval
            };

            match self.poll.poll(&mut self.events, Some(timeout)) {
                Ok(()) => {},
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SessionError::Poll(e)),
            }

            let mut control_ready = !self.control_registered;
            let mut link_ready = session.link_has_pending();
            for event in self.events.iter() {
                match event.token() {
                    CONTROL => control_ready = true,
                    LINK => link_ready = true,
                    _ => {},
                }
            }

            if control_ready {
                control.fill().map_err(SessionError::Control)?;
                self.rearm_control(control.fd());
            }

            match control.next_line() {
                Some(line) => {
                    trace!("Control line: {:?}", line);
                    session.handle_line(&line)?;
                },
                None if control.is_closed() => {
                    info!("Control channel closed");
                    return Ok(ExitReason::ControlClosed);
                },
                None => {},
            }

            // 未注册 fd 的链路（如 mock）每轮都读取一次
            let unregistered_link = session.is_connected() && self.link_registration.is_none();
            if session.is_connected() && (link_ready || unregistered_link) {
                let lines = session.poll_link()?;
                if lines > 0 {
                    debug!("Processed {} reply line(s)", lines);
                }
                self.rearm_link();
            }
        }
    }

    fn register_control(&mut self, fd: RawFd) {
        match self
            .poll
            .registry()
            .register(&mut SourceFd(&fd), CONTROL, Interest::READABLE)
        {
            Ok(()) => self.control_registered = true,
            Err(e) => {
                // 普通文件不支持 epoll
                debug!("Control channel not pollable ({}), reading eagerly", e);
                self.control_registered = false;
            },
        }
    }

    fn rearm_control(&mut self, fd: RawFd) {
        if self.control_registered
            && let Err(e) =
                self.poll
                    .registry()
                    .reregister(&mut SourceFd(&fd), CONTROL, Interest::READABLE)
        {
            warn!("Failed to re-arm control channel: {}", e);
        }
    }

    /// 链路被替换或释放后更新注册
    fn sync_link<C: Connector, W: Write>(&mut self, session: &Session<C, W>) {
        let current = session.link_fd().map(|fd| (fd, session.link_epoch()));
        if current == self.link_registration {
            return;
        }

        if let Some((fd, _)) = self.link_registration.take() {
            // 链路关闭后 fd 可能已失效
            let _ = self.poll.registry().deregister(&mut SourceFd(&fd));
        }

        if let Some((fd, epoch)) = current {
            match self
                .poll
                .registry()
                .register(&mut SourceFd(&fd), LINK, Interest::READABLE)
            {
                Ok(()) => {
                    debug!("Link fd {} registered (epoch {})", fd, epoch);
                    self.link_registration = Some((fd, epoch));
                },
                Err(e) => warn!("Failed to register link fd {}: {}", fd, e),
            }
        }
    }

    fn rearm_link(&mut self) {
        if let Some((fd, _)) = self.link_registration
            && let Err(e) =
                self.poll
                    .registry()
                    .reregister(&mut SourceFd(&fd), LINK, Interest::READABLE)
        {
            warn!("Failed to re-arm link: {}", e);
        }
    }
}
