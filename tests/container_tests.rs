//! Container-level behaviour: demuxing, compositing and malformed input.

use webpanim::mux::{BlendMethod, DisposeMethod, MuxFrame, WebPDemuxer, WebPMux};
use webpanim::{
    decode_webp, decode_webp_with_limits, AnimationDecoder, CompressParams, EncodingOptions,
    Error, LibwebpCodec, Limits, PixelCodec, WebpEncoder,
};

/// Create a solid-color RGBA frame.
fn solid_rgba(width: u32, height: u32, r: u8, g: u8, b: u8, a: u8) -> Vec<u8> {
    [r, g, b, a]
        .iter()
        .cycle()
        .take((width * height * 4) as usize)
        .copied()
        .collect()
}

fn lossless_frame(
    rgba: &[u8],
    (x, y, w, h): (u32, u32, u32, u32),
    dispose: DisposeMethod,
    blend: BlendMethod,
) -> MuxFrame {
    let params = CompressParams {
        lossless: true,
        quality: 100,
        method: 4,
    };
    let compressed = LibwebpCodec.compress(rgba, w, h, &params).unwrap();
    MuxFrame {
        x_offset: x,
        y_offset: y,
        width: w,
        height: h,
        duration_ms: 50,
        dispose,
        blend,
        bitstream: compressed.bitstream,
        alpha_data: compressed.alpha_data,
        is_lossless: compressed.is_lossless,
    }
}

fn three_frame_animation() -> Vec<u8> {
    let mut encoder = WebpEncoder::new(16, 16, None).unwrap();
    for shade in [0, 100, 200] {
        encoder
            .add_frame(solid_rgba(16, 16, shade, shade, shade, 255), Some(30))
            .unwrap();
    }
    encoder.finish(None).unwrap()
}

/// Hand-built animated container whose only frame holds `codec_fourcc`.
fn animation_with_frame_chunk(codec_fourcc: &[u8; 4]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"RIFF");
    data.extend_from_slice(&70u32.to_le_bytes());
    data.extend_from_slice(b"WEBP");

    data.extend_from_slice(b"VP8X");
    data.extend_from_slice(&10u32.to_le_bytes());
    data.extend_from_slice(&[0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

    data.extend_from_slice(b"ANIM");
    data.extend_from_slice(&6u32.to_le_bytes());
    data.extend_from_slice(&[0, 0, 0, 0, 0, 0]);

    data.extend_from_slice(b"ANMF");
    data.extend_from_slice(&26u32.to_le_bytes());
    // 1x1 frame at the origin, 10ms, no flags.
    data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 10, 0, 0, 0]);
    data.extend_from_slice(codec_fourcc);
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&[0, 0]);

    assert_eq!(data.len(), 78);
    data
}

#[test]
fn demux_encoded_animation() {
    let data = three_frame_animation();
    let demuxer = WebPDemuxer::new(&data).unwrap();

    assert!(demuxer.is_animated());
    assert_eq!(demuxer.num_frames(), 3);
    assert_eq!((demuxer.canvas_width(), demuxer.canvas_height()), (16, 16));
    assert_eq!(demuxer.total_duration_ms(), 90);

    for frame in demuxer.frames() {
        assert!(!frame.is_lossy);
        assert!(!frame.bitstream.is_empty());
        assert_eq!(frame.blend, BlendMethod::Overwrite);
        assert_eq!(frame.dispose, DisposeMethod::None);
    }

    // 1-based indexing
    assert!(demuxer.frame(0).is_none());
    assert!(demuxer.frame(1).is_some());
    assert!(demuxer.frame(3).is_some());
    assert!(demuxer.frame(4).is_none());
}

#[test]
fn decoder_info_and_iteration() {
    let data = three_frame_animation();
    let decoder = AnimationDecoder::new(&data).unwrap();
    let info = decoder.info();
    assert_eq!((info.canvas_width, info.canvas_height), (16, 16));
    assert_eq!(info.frame_count, 3);
    assert_eq!(info.loop_count, 0);
    assert_eq!(info.total_duration_ms, 90);

    let frames: Vec<_> = decoder.collect::<Result<_, _>>().unwrap();
    let timestamps: Vec<u64> = frames.iter().map(|f| f.timestamp_ms).collect();
    assert_eq!(timestamps, [30, 60, 90]);
    assert_eq!(frames[2].data, solid_rgba(16, 16, 200, 200, 200, 255));
}

#[test]
fn compositing_honours_blend_and_dispose() {
    let red = solid_rgba(4, 4, 255, 0, 0, 255);
    let half_blue = solid_rgba(2, 2, 0, 0, 255, 128);
    let green = solid_rgba(1, 1, 0, 255, 0, 255);

    let mut mux = WebPMux::new(4, 4);
    mux.set_animation([0; 4], 0);
    mux.push_frame(lossless_frame(&red, (0, 0, 4, 4), DisposeMethod::None, BlendMethod::Overwrite))
        .unwrap();
    mux.push_frame(lossless_frame(
        &half_blue,
        (2, 2, 2, 2),
        DisposeMethod::Background,
        BlendMethod::AlphaBlend,
    ))
    .unwrap();
    mux.push_frame(lossless_frame(&green, (0, 0, 1, 1), DisposeMethod::None, BlendMethod::Overwrite))
        .unwrap();
    let data = mux.assemble().unwrap();

    let decoded = decode_webp(&data).unwrap();
    assert_eq!(decoded.frames.len(), 3);
    let pixel = |frame: usize, x: usize, y: usize| -> [u8; 4] {
        let off = (y * 4 + x) * 4;
        decoded.frames[frame].data[off..off + 4].try_into().unwrap()
    };

    // Blended blue over opaque red stays opaque and lands halfway.
    let blended = pixel(1, 3, 3);
    assert_eq!(blended[3], 255);
    assert!((120..=135).contains(&blended[0]), "{blended:?}");
    assert!((120..=135).contains(&blended[2]), "{blended:?}");
    assert_eq!(pixel(1, 0, 0), [255, 0, 0, 255]);

    // The blended rectangle was disposed to transparent before frame 3.
    assert_eq!(pixel(2, 2, 2), [0, 0, 0, 0]);
    assert_eq!(pixel(2, 3, 3), [0, 0, 0, 0]);
    assert_eq!(pixel(2, 0, 0), [0, 255, 0, 255]);
    assert_eq!(pixel(2, 1, 0), [255, 0, 0, 255]);
}

#[test]
fn opaque_alpha_blend_replaces_canvas() {
    let under = solid_rgba(2, 2, 10, 20, 30, 255);
    let over = solid_rgba(2, 2, 200, 100, 50, 255);

    let mut mux = WebPMux::new(2, 2);
    mux.set_animation([0; 4], 0);
    mux.push_frame(lossless_frame(&under, (0, 0, 2, 2), DisposeMethod::None, BlendMethod::Overwrite))
        .unwrap();
    mux.push_frame(lossless_frame(&over, (0, 0, 2, 2), DisposeMethod::None, BlendMethod::AlphaBlend))
        .unwrap();
    let data = mux.assemble().unwrap();

    let decoded = decode_webp(&data).unwrap();
    assert_eq!(decoded.frames[1].data, over);
}

#[test]
fn bad_signature_is_malformed() {
    let mut data = three_frame_animation();
    data[0..4].copy_from_slice(b"RIFX");
    assert!(matches!(decode_webp(&data), Err(Error::MalformedContainer(_))));

    let mut data = three_frame_animation();
    data[8..12].copy_from_slice(b"WEBQ");
    assert!(matches!(decode_webp(&data), Err(Error::MalformedContainer(_))));

    assert!(matches!(decode_webp(b"RIFF"), Err(Error::MalformedContainer(_))));
}

#[test]
fn truncated_file_is_reported() {
    let data = three_frame_animation();
    let cut = &data[..data.len() / 2];
    assert!(matches!(decode_webp(cut), Err(Error::TruncatedData { .. })));
}

#[test]
fn chunk_overrun_inside_riff_is_truncation() {
    let mut data = animation_with_frame_chunk(b"VP8L");
    // RIFF size stays consistent; only the ANMF chunk claims more than remains.
    data[48..52].copy_from_slice(&126u32.to_le_bytes());
    assert!(matches!(WebPDemuxer::new(&data), Err(Error::TruncatedData { .. })));
    assert!(matches!(decode_webp(&data), Err(Error::TruncatedData { .. })));
}

#[test]
fn unknown_frame_codec_is_unsupported() {
    let data = animation_with_frame_chunk(b"VP9 ");
    assert!(matches!(
        decode_webp(&data),
        Err(Error::UnsupportedCodec(fourcc)) if &fourcc == b"VP9 "
    ));
}

#[test]
fn undecodable_bitstream_is_codec_error() {
    let data = animation_with_frame_chunk(b"VP8 ");
    // Container is well formed; the pixel codec rejects the two-byte frame.
    assert!(WebPDemuxer::new(&data).is_ok());
    assert!(matches!(decode_webp(&data), Err(Error::Codec(_))));
}

#[test]
fn limits_are_enforced() {
    let data = three_frame_animation();

    let few_frames = Limits::none().max_frame_count(2);
    assert!(matches!(
        decode_webp_with_limits(&data, &few_frames),
        Err(Error::LimitExceeded(_))
    ));

    let small = Limits::none().max_dimensions(8, 8);
    assert!(matches!(
        decode_webp_with_limits(&data, &small),
        Err(Error::LimitExceeded(_))
    ));

    // Three 16x16 RGBA canvases need 3072 bytes.
    let tight = Limits::none().max_memory(3071);
    assert!(matches!(
        decode_webp_with_limits(&data, &tight),
        Err(Error::LimitExceeded(_))
    ));
    assert!(decode_webp_with_limits(&data, &Limits::none().max_memory(3072)).is_ok());

    let tiny_file = Limits::none().max_file_size(16);
    assert!(matches!(
        decode_webp_with_limits(&data, &tiny_file),
        Err(Error::LimitExceeded(_))
    ));
}

#[test]
fn lossy_alpha_frames_use_alph_chunks() {
    let options = EncodingOptions::new()
        .lossless(false)
        .quality(75.0)
        .minimize_size(false);
    let mut encoder = WebpEncoder::new(8, 8, Some(options)).unwrap();
    encoder.add_frame(solid_rgba(8, 8, 10, 20, 30, 255), None).unwrap();
    encoder.add_frame(solid_rgba(8, 8, 10, 20, 30, 64), None).unwrap();
    let data = encoder.finish(None).unwrap();

    let demuxer = WebPDemuxer::new(&data).unwrap();
    assert!(demuxer.has_alpha());
    let frames: Vec<_> = demuxer.frames().collect();
    assert!(frames.iter().all(|f| f.is_lossy));
    assert!(frames[0].alpha_data.is_none());
    assert!(frames[1].alpha_data.is_some());
}
