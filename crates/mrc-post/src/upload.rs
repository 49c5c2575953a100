//! 程序下载
//!
//! 先发送空写入帧 `:W\r` 清空控制器程序内存，再逐行发送
//! `:W<去掉空格的行>\r`。程序总长（不计空格）超过
//! [`MAX_PROGRAM_BYTES`] 时不发送任何字节。

use crate::{MrcPost, PostError};
use mrc_protocol::{Frame, MAX_PROGRAM_BYTES, Opcode};
use mrc_serial::Link;
use tracing::{info, warn};

/// 下载结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendReport {
    /// 已发送（含清空帧在内的帧数与字节数）
    Sent { frames: usize, bytes: usize },
    /// 程序过长，未发送
    TooLarge { size: usize },
}

/// 程序大小：去掉所有空格后的字节数
pub fn program_size(program: &str) -> usize {
    program.bytes().filter(|&b| b != b' ').count()
}

/// 将程序切分为写入帧（不含清空帧）
pub fn program_frames(program: &str) -> Result<Vec<Frame>, PostError> {
    program
        .trim()
        .lines()
        .map(|line| Frame::new(Opcode::Write, line.replace(' ', "")).map_err(PostError::from))
        .collect()
}

impl MrcPost {
    /// 通过已打开的链路下载当前程序
    ///
    /// 过长不是错误：记录日志后返回 [`SendReport::TooLarge`]。
    pub fn send_program(&mut self, link: &mut dyn Link) -> Result<SendReport, PostError> {
        self.add_log(&format!("sending over serial to port: {}", link.name()));

        let size = program_size(self.program());
        if size > MAX_PROGRAM_BYTES {
            self.add_log(&format!(
                "program to long: {size} max {MAX_PROGRAM_BYTES} Bytes"
            ));
            warn!("Program not sent ({} bytes)", size);
            return Ok(SendReport::TooLarge { size });
        }

        // 先完成全部编码，避免发送到一半才发现非法行
        let frames = program_frames(self.program())?;

        let clear = Frame::bare(Opcode::Write);
        link.send_frame(&clear)?;
        let mut bytes = clear.encode().len();

        for frame in &frames {
            self.add_log(&String::from_utf8_lossy(&frame.encode()));
            link.send_frame(frame)?;
            bytes += frame.encode().len();
        }

        info!("Program sent: {} frame(s), {} bytes", frames.len() + 1, bytes);
        Ok(SendReport::Sent {
            frames: frames.len() + 1,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrc_serial::mock::{MockHandle, MockLink};

    #[test]
    fn test_send_program_frames() {
        let handle = MockHandle::new();
        let mut link = MockLink::new("/dev/ttyUSB0", handle.clone());
        let mut post = MrcPost::new();
        post.set_speed(50.0);
        post.pause(-1.0);

        let report = post.send_program(&mut link).unwrap();

        assert_eq!(
            handle.written(),
            vec![
                b":W\r".to_vec(),
                b":WN1V50.00\r".to_vec(),
                b":WN2PAUSE\r".to_vec(),
            ]
        );
        assert_eq!(report, SendReport::Sent { frames: 3, bytes: 3 + 11 + 10 });
        assert!(post.log().starts_with("sending over serial to port: /dev/ttyUSB0\n"));
        assert!(post.log().contains(":WN1V50.00\r"));
    }

    #[test]
    fn test_oversized_program_writes_nothing() {
        let handle = MockHandle::new();
        let mut link = MockLink::new("/dev/ttyUSB0", handle.clone());
        let mut post = MrcPost::new();
        for _ in 0..200 {
            post.move_j(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        }
        let size = program_size(post.program());
        assert!(size > MAX_PROGRAM_BYTES);

        let report = post.send_program(&mut link).unwrap();

        assert_eq!(report, SendReport::TooLarge { size });
        assert!(handle.written().is_empty());
        assert!(
            post.log()
                .contains(&format!("program to long: {size} max 2000 Bytes"))
        );
    }

    #[test]
    fn test_size_excludes_spaces() {
        assert_eq!(program_size("N1  V 50.00\n"), 9);
    }

    #[test]
    fn test_non_ascii_line_rejected_before_sending() {
        let handle = MockHandle::new();
        let mut link = MockLink::new("/dev/ttyUSB0", handle.clone());
        let mut post = MrcPost::new();
        post.set_speed(10.0);
        post.run_message("Ventil geöffnet", true);

        assert!(matches!(
            post.send_program(&mut link),
            Err(PostError::Protocol(_))
        ));
        assert!(handle.written().is_empty());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let handle = MockHandle::new();
        handle.fail_writes(true);
        let mut link = MockLink::new("/dev/ttyUSB0", handle);
        let mut post = MrcPost::new();
        post.set_speed(10.0);
        assert!(matches!(
            post.send_program(&mut link),
            Err(PostError::Link(_))
        ));
    }
}
