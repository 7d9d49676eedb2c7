use super::*;
use crate::{
    foundation::core::{ClearColor, Size2},
    gpu::{
        command::{CommandBufferStatus, LoadAction, RenderPassDescriptor},
        device::Device,
        texture::{PixelFormat, TextureDescriptor, TextureUsage},
    },
};
use std::sync::{Arc, Mutex};

fn target(device: &Device, label: &str) -> crate::gpu::texture::Texture {
    device
        .make_texture(&TextureDescriptor {
            label: label.to_string(),
            size: Size2::new(2, 2),
            format: PixelFormat::Rgba16Float,
            usage: TextureUsage::RENDER_TARGET_AND_READ,
        })
        .unwrap()
}

#[test]
fn buffers_execute_in_commit_order() {
    let device = Device::system_default().unwrap();
    let queue = device.make_command_queue("order").unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let mut cb = queue.make_command_buffer(format!("cb{i}")).unwrap();
            let log = Arc::clone(&log);
            cb.add_completed_handler(move |_| log.lock().unwrap().push(i));
            cb.commit()
        })
        .collect();
    for h in &handles {
        assert_eq!(h.wait_until_completed(), CommandBufferStatus::Completed);
    }
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn scheduled_runs_before_completed_and_copy_executes() {
    let device = Device::system_default().unwrap();
    let queue = device.make_command_queue("copy").unwrap();
    let src = target(&device, "src");
    let dst = target(&device, "dst");
    src.clear(ClearColor([0.5, 0.25, 1.0, 1.0]));

    let events = Arc::new(Mutex::new(Vec::new()));
    let mut cb = queue.make_command_buffer("copy").unwrap();
    cb.copy_texture(&src, &dst).unwrap();
    let e = Arc::clone(&events);
    cb.add_scheduled_handler(move || e.lock().unwrap().push("scheduled"));
    let e = Arc::clone(&events);
    cb.add_completed_handler(move |status| {
        assert_eq!(*status, CommandBufferStatus::Completed);
        e.lock().unwrap().push("completed");
    });
    let handle = cb.commit();
    assert_eq!(handle.wait_until_completed(), CommandBufferStatus::Completed);
    assert_eq!(*events.lock().unwrap(), vec!["scheduled", "completed"]);
    assert_eq!(dst.texel(1, 1), Some([0.5, 0.25, 1.0, 1.0]));
}

#[test]
fn clear_only_pass_is_not_recorded_without_a_draw() {
    let device = Device::system_default().unwrap();
    let queue = device.make_command_queue("noop").unwrap();
    let tex = target(&device, "t");
    let mut cb = queue.make_command_buffer("noop").unwrap();
    let desc = RenderPassDescriptor::new("noop", Size2::new(2, 2)).with_attachment(
        &tex,
        LoadAction::Clear,
        ClearColor::OPAQUE_BLACK,
    );
    let enc = cb.make_render_command_encoder(&desc).unwrap();
    enc.end_encoding();
    assert_eq!(cb.pass_count(), 0);
    assert_eq!(cb.commit().wait_until_completed(), CommandBufferStatus::Completed);
}

#[test]
fn dropping_the_queue_drains_committed_work() {
    let device = Device::system_default().unwrap();
    let queue = device.make_command_queue("drain").unwrap();
    let src = target(&device, "src");
    let dst = target(&device, "dst");
    src.clear(ClearColor([1.0, 1.0, 1.0, 1.0]));
    let mut cb = queue.make_command_buffer("drain").unwrap();
    cb.copy_texture(&src, &dst).unwrap();
    let handle = cb.commit();
    drop(queue);
    assert_eq!(handle.status(), CommandBufferStatus::Completed);
    assert_eq!(dst.texel(0, 0), Some([1.0, 1.0, 1.0, 1.0]));
}
