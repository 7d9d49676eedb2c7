use super::*;
use crate::gpu::{
    command::CommandBufferStatus,
    texture::{TextureDescriptor, TextureUsage},
};

fn texture(device: &Device, label: &str, size: Size2, usage: TextureUsage) -> Texture {
    device
        .make_texture(&TextureDescriptor {
            label: label.to_string(),
            size,
            format: PixelFormat::Rgba16Float,
            usage,
        })
        .unwrap()
}

#[test]
fn solid_image_at_focal_depth_is_unchanged() {
    let device = Device::system_default().unwrap();
    let queue = device.make_command_queue("occlusion").unwrap();
    let size = Size2::new(2, 2);
    let color = texture(&device, "color", size, TextureUsage::SHADER_READ);
    let depth = texture(&device, "depth", size, TextureUsage::SHADER_READ);
    color.upload(&[[0.8, 0.4, 0.2, 1.0]; 4]).unwrap();
    depth.upload(&[[0.5, 0.5, 0.5, 1.0]; 4]).unwrap();
    let out_color = texture(&device, "out_color", size, TextureUsage::RENDER_TARGET_AND_READ);
    let out_depth = texture(&device, "out_depth", size, TextureUsage::RENDER_TARGET_AND_READ);

    let mut pass = ParallaxOcclusionPass::new(&device).unwrap();
    pass.set_offset(Vec2::ZERO);
    pass.set_focal_point(0.5);
    let mut cb = queue.make_command_buffer("frame").unwrap();
    pass.encode(
        &mut cb,
        &color,
        &depth,
        &out_color,
        &out_depth,
        size,
        ClearColor::OPAQUE_BLACK,
    )
    .unwrap();
    assert_eq!(cb.commit().wait_until_completed(), CommandBufferStatus::Completed);

    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(out_color.texel(x, y), Some([0.8, 0.4, 0.2, 1.0]));
            assert_eq!(out_depth.texel(x, y), Some([0.5, 0.5, 0.5, 1.0]));
        }
    }
}

#[test]
fn invalid_descriptor_leaves_buffer_untouched() {
    let device = Device::system_default().unwrap();
    let queue = device.make_command_queue("occlusion").unwrap();
    let size = Size2::new(2, 2);
    let color = texture(&device, "color", size, TextureUsage::SHADER_READ);
    let depth = texture(&device, "depth", size, TextureUsage::SHADER_READ);
    let out_color = texture(&device, "out_color", size, TextureUsage::RENDER_TARGET_AND_READ);
    let out_depth = texture(&device, "out_depth", size, TextureUsage::RENDER_TARGET_AND_READ);

    let mut pass = ParallaxOcclusionPass::new(&device).unwrap();
    pass.set_offset(Vec2::new(0.05, 0.0));
    let mut cb = queue.make_command_buffer("frame").unwrap();
    let err = pass
        .encode(
            &mut cb,
            &color,
            &depth,
            &out_color,
            &out_depth,
            Size2::new(4, 4),
            ClearColor::OPAQUE_BLACK,
        )
        .unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(cb.pass_count(), 0);
    assert_eq!(pass.buffer.read().offset_x, 0.0);
    assert_eq!(pass.uniforms().offset_x, 0.05);
}
