//! Mock 链路
//!
//! 所有 [`MockLink`] 共享同一个 [`MockHandle`]，测试代码通过句柄
//! 注入控制器应答、检查写出的帧、模拟断线。

use crate::{Connector, Link, LinkError};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    inbound: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    fail_writes: bool,
    closed: bool,
}

/// Mock 链路共享句柄
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 注入控制器发往主机的字节
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.lock().inbound.extend(bytes.iter().copied());
    }

    /// 每次 `write` 调用写出的字节
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    /// 写出的全部字节（拼接）
    pub fn written_bytes(&self) -> Vec<u8> {
        self.lock().written.concat()
    }

    pub fn clear_written(&self) {
        self.lock().written.clear();
    }

    /// 之后的写入全部失败
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// 模拟设备断开：读完剩余字节后返回 `Closed`
    pub fn close(&self) {
        self.lock().closed = true;
    }
}

/// 内存链路
#[derive(Debug)]
pub struct MockLink {
    name: String,
    handle: MockHandle,
}

impl MockLink {
    pub fn new(name: impl Into<String>, handle: MockHandle) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }
}

impl Link for MockLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let mut state = self.handle.lock();
        if state.fail_writes {
            return Err(LinkError::Write(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        state.written.push(bytes.to_vec());
        Ok(())
    }

    fn read_until(&mut self, terminator: u8, _timeout: Duration) -> Result<Vec<u8>, LinkError> {
        let mut state = self.handle.lock();
        if state.closed && state.inbound.is_empty() {
            return Err(LinkError::Closed("mock link closed".into()));
        }
        let mut line = Vec::new();
        while let Some(b) = state.inbound.pop_front() {
            line.push(b);
            if b == terminator {
                break;
            }
        }
        Ok(line)
    }

    fn bytes_pending(&mut self) -> Result<usize, LinkError> {
        Ok(self.handle.lock().inbound.len())
    }
}

/// Mock 连接器
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    handle: MockHandle,
    unavailable: HashSet<String>,
    opened: Vec<String>,
}

impl MockConnector {
    pub fn new(handle: MockHandle) -> Self {
        Self {
            handle,
            ..Self::default()
        }
    }

    /// 指定端口打开失败
    pub fn with_unavailable(mut self, port: impl Into<String>) -> Self {
        self.unavailable.insert(port.into());
        self
    }

    pub fn handle(&self) -> &MockHandle {
        &self.handle
    }

    /// 成功打开过的端口
    pub fn opened(&self) -> &[String] {
        &self.opened
    }
}

impl Connector for MockConnector {
    type Link = MockLink;

    fn open(&mut self, port: &str) -> Result<MockLink, LinkError> {
        if self.unavailable.contains(port) {
            return Err(LinkError::unavailable(port, "No such file or directory"));
        }
        self.opened.push(port.to_string());
        Ok(MockLink::new(port, self.handle.clone()))
    }
}
