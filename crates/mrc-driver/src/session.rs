//! 中继会话
//!
//! 会话独占串口链路与事务日志，生命周期为：
//!
//! ```text
//! new → start → (handle_line / poll_link)* → shutdown
//! ```
//!
//! 所有处理都在调用线程上同步完成：一条控制命令（包括 CJNT 的
//! 两行同步读取）处理完毕之前，不会去处理串口上的其他应答。

use crate::command::{BridgeCommand, CommandError};
use crate::error::SessionError;
use crate::journal::Journal;
use crate::state::{ConnectionState, StatusTracker};
use crate::translate::{Dispatch, connect_frame, translate};
use mrc_protocol::{
    FRAME_END, Frame, JointReadout, SEQ_SENTINEL, decode_stream, is_completion_ack, trim_line,
};
use mrc_serial::{Connector, Link, LinkError};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 启动时输出的横幅
pub const BANNER: &str = "MRC remote";

/// 未连接时的提示
pub const CONNECT_HINT: &str = "use CONNECT <serialport> to open a connection";

/// 会话参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// 单次读取超时
    pub read_timeout: Duration,
    /// CJNT 查询后等待控制器准备应答的时间
    pub joint_query_delay: Duration,
    /// 状态去重
    pub dedup_status: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
            joint_query_delay: Duration::from_millis(100),
            dedup_status: false,
        }
    }
}

/// 中继会话
pub struct Session<C: Connector, W: Write> {
    connector: C,
    link: Option<C::Link>,
    /// 每次成功连接递增，用于识别链路是否被替换
    link_epoch: u64,
    status: StatusTracker,
    journal: Journal,
    out: W,
    options: SessionOptions,
}

impl<C: Connector, W: Write> Session<C, W> {
    pub fn new(connector: C, journal: Journal, out: W, options: SessionOptions) -> Self {
        Self {
            connector,
            link: None,
            link_epoch: 0,
            status: StatusTracker::new(options.dedup_status),
            journal,
            out,
            options,
        }
    }

    /// 输出横幅并报告启动状态（Working）
    pub fn start(&mut self) -> Result<(), SessionError> {
        info!("Bridge session starting");
        self.journal.note("starting");
        self.write_out(BANNER)?;
        self.write_out(CONNECT_HINT)?;
        self.set_status(ConnectionState::Working)
    }

    pub fn state(&self) -> ConnectionState {
        self.status.current()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn link(&self) -> Option<&C::Link> {
        self.link.as_ref()
    }

    pub fn link_epoch(&self) -> u64 {
        self.link_epoch
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// 状态通道
    pub fn output(&self) -> &W {
        &self.out
    }

    /// 链路文件描述符（用于事件轮询注册）
    #[cfg(unix)]
    pub fn link_fd(&self) -> Option<std::os::unix::io::RawFd> {
        self.link.as_ref().and_then(|l| l.raw_fd())
    }

    /// 链路上是否还有未读取的字节
    pub fn link_has_pending(&mut self) -> bool {
        match self.link.as_mut() {
            Some(link) => link.bytes_pending().map(|n| n > 0).unwrap_or(false),
            None => false,
        }
    }

    /// 处理一行控制输入
    pub fn handle_line(&mut self, line: &str) -> Result<(), SessionError> {
        let line = trim_line(line);
        self.journal.received(line);

        let command = match BridgeCommand::parse(line) {
            Ok(command) => command,
            Err(CommandError::Empty) => return Ok(()),
            Err(e) => {
                warn!("Rejected control line {:?}: {}", line, e);
                return self.emit(&e.to_string());
            },
        };

        if !self.is_connected() && !matches!(command, BridgeCommand::Connect { .. }) {
            return self.emit(CONNECT_HINT);
        }

        debug!("Dispatching {}", command.name());
        let dispatch = match translate(&command) {
            Ok(dispatch) => dispatch,
            Err(e) => {
                warn!("Cannot encode {:?}: {}", line, e);
                return self.emit(&format!("{}: {}", command.name(), e));
            },
        };
        match dispatch {
            Dispatch::Connect { port } => self.connect(&port),
            Dispatch::Send { frame, status } => {
                if let Some(next) = status {
                    self.set_status(next)?;
                }
                self.send(&frame)?;
                Ok(())
            },
            Dispatch::QueryJoints { frame } => self.query_joints(&frame),
            Dispatch::Reject { message } => self.emit(&message),
        }
    }

    /// 对链路做一次有界读取
    ///
    /// 返回收到的完整行数。完成确认使状态回到 Ready。
    pub fn poll_link(&mut self) -> Result<usize, SessionError> {
        let Some(bytes) = self.read_link()? else {
            return Ok(0);
        };
        let lines = decode_stream(&bytes, FRAME_END);
        if lines.is_empty() && !bytes.is_empty() {
            debug!("Discarded {} bytes of unterminated reply", bytes.len());
        }
        for line in &lines {
            let text = String::from_utf8_lossy(line);
            self.journal.received(trim_line(&text));
            if is_completion_ack(line, SEQ_SENTINEL) {
                debug!("Completion acknowledged: {}", trim_line(&text));
                self.set_status(ConnectionState::Ready)?;
            }
        }
        Ok(lines.len())
    }

    /// 主动断开链路
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        if let Some(link) = self.link.take() {
            info!("Disconnecting from {}", link.name());
        }
        self.set_status(ConnectionState::Disconnected)
    }

    /// 结束会话：刷新日志、关闭链路
    pub fn shutdown(&mut self) {
        info!("Bridge session shutting down");
        self.link = None;
        self.journal.flush();
        if let Err(e) = self.out.flush() {
            warn!("Status channel flush failed: {}", e);
        }
    }

    fn connect(&mut self, port: &str) -> Result<(), SessionError> {
        if let Some(link) = &self.link {
            let message = format!("already connected to {}", link.name());
            return self.emit(&message);
        }

        info!("Connecting to {}", port);
        self.journal.note(&format!("connecting to {port}"));
        match self.connector.open(port) {
            Ok(link) => {
                self.link = Some(link);
                self.link_epoch += 1;
                self.set_status(ConnectionState::Ready)?;
                self.send(&connect_frame())?;
                Ok(())
            },
            Err(e) => {
                error!("Failed to open {}: {}", port, e);
                self.emit(&format!("connection failed: {e}"))?;
                self.set_status(ConnectionState::NotConnected)
            },
        }
    }

    /// CJNT：发送查询，依次读取序号行与关节角行
    fn query_joints(&mut self, frame: &Frame) -> Result<(), SessionError> {
        self.set_status(ConnectionState::Working)?;
        if !self.send(frame)? {
            return Ok(());
        }
        if !self.options.joint_query_delay.is_zero() {
            std::thread::sleep(self.options.joint_query_delay);
        }

        let Some(sequence) = self.read_reply_line()? else {
            return Ok(());
        };
        debug!("Joint query sequence line: {:?}", sequence);
        let Some(angles) = self.read_reply_line()? else {
            return Ok(());
        };

        match JointReadout::parse(&angles) {
            Ok(readout) => {
                self.emit(&format!("JNTS {}", readout.joined()))?;
                self.set_status(ConnectionState::Ready)
            },
            Err(e) => {
                warn!("Unusable joint reply {:?}: {}", angles, e);
                Ok(())
            },
        }
    }

    /// 读取一行应答并记录；链路失效时返回 `None`
    fn read_reply_line(&mut self) -> Result<Option<String>, SessionError> {
        let Some(bytes) = self.read_link()? else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();
        self.journal.received(trim_line(&text));
        Ok(Some(text))
    }

    fn read_link(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        let Some(link) = self.link.as_mut() else {
            return Ok(None);
        };
        match link.read_until(FRAME_END, self.options.read_timeout) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                self.link_failed(e)?;
                Ok(None)
            },
        }
    }

    /// 发送一帧；链路失效时返回 `false`
    fn send(&mut self, frame: &Frame) -> Result<bool, SessionError> {
        let Some(link) = self.link.as_mut() else {
            return Ok(false);
        };
        let result = link.send_frame(frame);
        self.journal.transmitted(&frame.to_string());
        match result {
            Ok(()) => {
                debug!("Sent {}", frame);
                Ok(true)
            },
            Err(e) => {
                self.link_failed(e)?;
                Ok(false)
            },
        }
    }

    /// 链路错误 → 释放链路并切换状态
    fn link_failed(&mut self, err: LinkError) -> Result<(), SessionError> {
        let next = match err {
            LinkError::Closed(_) => ConnectionState::Disconnected,
            _ => ConnectionState::ConnectionProblem,
        };
        error!("Link failure: {} -> {}", err, next);
        self.link = None;
        self.set_status(next)
    }

    fn set_status(&mut self, next: ConnectionState) -> Result<(), SessionError> {
        match self.status.transition(next) {
            Some(state) => self.emit(&state.status_line()),
            None => Ok(()),
        }
    }

    /// 写状态通道并记录日志
    fn emit(&mut self, message: &str) -> Result<(), SessionError> {
        self.write_out(message)?;
        self.journal.transmitted(message);
        Ok(())
    }

    fn write_out(&mut self, message: &str) -> Result<(), SessionError> {
        writeln!(self.out, "{message}").map_err(SessionError::StatusChannel)?;
        self.out.flush().map_err(SessionError::StatusChannel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrc_serial::mock::{MockConnector, MockHandle};

    fn session() -> (Session<MockConnector, Vec<u8>>, MockHandle) {
        let handle = MockHandle::new();
        let connector = MockConnector::new(handle.clone()).with_unavailable("/dev/missing");
        let options = SessionOptions {
            joint_query_delay: Duration::ZERO,
            ..SessionOptions::default()
        };
        (
            Session::new(connector, Journal::disabled(), Vec::new(), options),
            handle,
        )
    }

    fn output(session: &Session<MockConnector, Vec<u8>>) -> Vec<String> {
        String::from_utf8_lossy(session.output())
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_start_announces_working() {
        let (mut s, _) = session();
        s.start().unwrap();
        assert_eq!(output(&s), vec![BANNER, CONNECT_HINT, "SMS:Working..."]);
        assert_eq!(s.state(), ConnectionState::Working);
    }

    #[test]
    fn test_commands_before_connect_print_hint() {
        let (mut s, handle) = session();
        s.handle_line("MOVJ 1 2 3 4 5 6").unwrap();
        assert_eq!(output(&s), vec![CONNECT_HINT]);
        assert!(handle.written().is_empty());
        assert_eq!(s.state(), ConnectionState::NotConnected);
    }

    #[test]
    fn test_connect_failure_reports_not_connected() {
        let (mut s, _) = session();
        s.handle_line("CONNECT /dev/missing").unwrap();
        let out = output(&s);
        assert!(out[0].starts_with("connection failed:"));
        assert_eq!(out[1], "SMS:Not connected");
        assert!(!s.is_connected());
    }

    #[test]
    fn test_second_connect_is_ignored() {
        let (mut s, handle) = session();
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        s.handle_line("CONNECT /dev/ttyUSB1").unwrap();
        assert_eq!(handle.written(), vec![b":Q\r".to_vec()]);
        assert_eq!(output(&s).last().unwrap(), "already connected to /dev/ttyUSB0");
        assert_eq!(s.link_epoch(), 1);
    }

    #[test]
    fn test_movc_not_sent() {
        let (mut s, handle) = session();
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        handle.clear_written();
        s.handle_line("MOVC").unwrap();
        assert!(handle.written().is_empty());
        assert_eq!(output(&s).last().unwrap(), "MOVC not implemented on MRC");
    }

    #[test]
    fn test_invalid_arguments_reported() {
        let (mut s, handle) = session();
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        handle.clear_written();
        s.handle_line("MOVL 1 2").unwrap();
        assert!(handle.written().is_empty());
        assert_eq!(
            output(&s).last().unwrap(),
            "MOVL expects 6 argument(s), got 2"
        );
    }

    #[test]
    fn test_write_failure_sets_connection_problem() {
        let (mut s, handle) = session();
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        handle.fail_writes(true);
        s.handle_line("SPEED 20").unwrap();
        assert_eq!(s.state(), ConnectionState::ConnectionProblem);
        assert!(!s.is_connected());
        assert_eq!(output(&s).last().unwrap(), "SMS:Connection problems");

        // 链路释放后可以重新连接
        handle.fail_writes(false);
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        assert_eq!(s.state(), ConnectionState::Ready);
        assert_eq!(s.link_epoch(), 2);
    }

    #[test]
    fn test_read_eof_sets_disconnected() {
        let (mut s, handle) = session();
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        handle.close();
        assert_eq!(s.poll_link().unwrap(), 0);
        assert_eq!(s.state(), ConnectionState::Disconnected);
        assert!(!s.is_connected());
    }

    #[test]
    fn test_unrelated_reply_keeps_state() {
        let (mut s, handle) = session();
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        s.handle_line("MOVJ 1 2 3 4 5 6").unwrap();
        handle.push_inbound(b":N141\r");
        assert_eq!(s.poll_link().unwrap(), 1);
        assert_eq!(s.state(), ConnectionState::Working);
    }

    #[test]
    fn test_partial_reply_is_discarded() {
        let (mut s, handle) = session();
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        s.handle_line("MOVJ 1 2 3 4 5 6").unwrap();
        handle.push_inbound(b":N142");
        assert_eq!(s.poll_link().unwrap(), 0);
        assert_eq!(s.state(), ConnectionState::Working);
    }

    #[test]
    fn test_disconnect() {
        let (mut s, _) = session();
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        s.disconnect().unwrap();
        assert!(!s.is_connected());
        assert_eq!(s.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_unencodable_line_is_reported_not_fatal() {
        let (mut s, handle) = session();
        s.handle_line("CONNECT /dev/ttyUSB0").unwrap();
        handle.clear_written();

        s.handle_line("HOMÉ now").unwrap();
        assert!(handle.written().is_empty());
        assert_eq!(output(&s).last().unwrap(), "HOMÉ: Payload is not ASCII");

        s.handle_line("SETDO 1 ön").unwrap();
        assert!(handle.written().is_empty());

        // 会话仍可继续下发
        s.handle_line("SPEED 5").unwrap();
        assert_eq!(handle.written(), vec![b":EV 5\r".to_vec()]);
        assert!(s.is_connected());
    }

    #[test]
    fn test_empty_line_ignored() {
        let (mut s, _) = session();
        s.handle_line("\n").unwrap();
        assert!(output(&s).is_empty());
    }
}
