//! 程序下载属性测试

use mrc_post::{MrcPost, SendReport, program_size};
use mrc_protocol::MAX_PROGRAM_BYTES;
use mrc_serial::mock::{MockHandle, MockLink};
use proptest::prelude::*;

proptest! {
    /// 超限程序绝不写出任何字节；未超限程序每行一帧外加清空帧
    #[test]
    fn prop_size_limit_is_all_or_nothing(speeds in prop::collection::vec(0.0f64..1000.0, 1..400)) {
        let mut post = MrcPost::new();
        for speed in &speeds {
            post.set_speed(*speed);
        }
        let handle = MockHandle::new();
        let mut link = MockLink::new("mock0", handle.clone());

        let report = post.send_program(&mut link).unwrap();
        let size = program_size(post.program());

        if size > MAX_PROGRAM_BYTES {
            prop_assert_eq!(report, SendReport::TooLarge { size });
            prop_assert!(handle.written().is_empty());
        } else {
            let written = handle.written();
            prop_assert_eq!(written.len(), speeds.len() + 1);
            prop_assert_eq!(&written[0], &b":W\r".to_vec());
            for frame in &written[1..] {
                prop_assert!(frame.starts_with(b":WN"));
                prop_assert!(!frame.contains(&b' '));
            }
        }
    }
}

#[test]
fn test_saved_program_can_be_sent() {
    let dir = tempfile::tempdir().unwrap();
    let mut post = MrcPost::new();
    post.run_message("generated", true);
    post.move_l(&[200.0, 200.0, 262.132034, 180.0, 0.0, -150.0]);
    post.run_code("TCP_On", true);
    post.pause(1000.0);
    let path = post.prog_save(dir.path(), "Program").unwrap();

    let mut loaded = MrcPost::from_text(std::fs::read_to_string(path).unwrap());
    let handle = MockHandle::new();
    let mut link = MockLink::new("mock0", handle.clone());
    assert!(matches!(
        loaded.send_program(&mut link).unwrap(),
        SendReport::Sent { frames: 5, .. }
    ));
    assert_eq!(
        handle.written()[2],
        b":WN2M01X20.000Y20.000Z26.213A180.000B0.000C-150.000\r".to_vec()
    );
}
