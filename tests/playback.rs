//! Integration tests for scene playback and the output containers

use std::fs::File;

use diagram_animator::{
    Animation, Color, ColorAttribute, FrameStore, Object, RenderContext, Scene, SceneConfig,
    SceneError, Style,
};
use pretty_assertions::assert_eq;

/// A scene with a 3×3 red box at `offset` on a canvas of the given size
fn boxed_scene(size: u32, padding: f64, offset: (f64, f64)) -> (Scene, diagram_animator::Handle) {
    let mut scene = Scene::new(SceneConfig::new(RenderContext::new(size, size)));
    let canvas = scene.canvas_mut();
    let root = canvas.root();
    canvas.style_mut(root).unwrap().padding = Some(padding);
    let style = Style::new().with_fill_color(Color::RED);
    let rect = canvas
        .add(root, Object::rect().size(3.0, 3.0).style(style), offset)
        .unwrap();
    (scene, rect)
}

#[test]
fn test_fade_produces_one_frame_per_tick_with_rising_alpha() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, rect) = boxed_scene(5, 1.0, (0.0, 0.0));
    scene.add(Animation::fade_in(rect, 0, 255).unwrap());

    let count = scene.play(5.0, dir.path().join("fade.png")).unwrap();
    assert_eq!(count, 5);
    let greens: Vec<u8> = scene.frames().iter().map(|f| f.get_pixel(2, 2)[1]).collect();
    assert_eq!(greens.first(), Some(&255));
    assert_eq!(greens.last(), Some(&0));
    assert!(greens.windows(2).all(|w| w[0] > w[1]), "{greens:?}");
}

#[test]
fn test_translate_moves_box_between_frames() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, rect) = boxed_scene(6, 0.0, (0.0, 2.0));
    scene.add(Animation::translate_by(rect, (0.0, -2.0)));

    let count = scene.play(2.0, dir.path().join("move.gif")).unwrap();
    assert_eq!(count, 2);
    let frames = scene.frames();
    // the top border starts on row 2 and ends on row 0
    assert_eq!(frames[0].get_pixel(0, 2).0, [0, 0, 0, 255]);
    assert_eq!(frames[0].get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(frames[1].get_pixel(0, 0).0, [0, 0, 0, 255]);

    let canvas = scene.canvas();
    let offset = canvas.offset(rect).unwrap();
    assert_eq!(canvas.evaluate(&offset.y), 0.0);
}

#[test]
fn test_replaying_scene_repeats_the_frames() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, rect) = boxed_scene(6, 0.0, (0.0, 2.0));
    scene.add(Animation::translate_by(rect, (0.0, -2.0)));
    let path = dir.path().join("move.png");

    scene.play(2.0, &path).unwrap();
    let first = scene.frames().to_vec();
    scene.play(2.0, &path).unwrap();
    assert_eq!(scene.frames(), &first[..]);

    let canvas = scene.canvas();
    let offset = canvas.offset(rect).unwrap();
    assert_eq!(canvas.evaluate(&offset.y), 0.0);
}

#[test]
fn test_keyframes_play_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, rect) = boxed_scene(5, 1.0, (0.0, 0.0));
    scene.add(Animation::wait(1.0));
    scene.keyframe().unwrap();
    scene.add(Animation::recolor(rect, ColorAttribute::Fill, Color::RED, Color::BLUE));

    let count = scene.play(2.0, dir.path().join("recolor.png")).unwrap();
    assert_eq!(count, 4);
    let centre: Vec<[u8; 4]> = scene.frames().iter().map(|f| f.get_pixel(2, 2).0).collect();
    assert_eq!(
        centre,
        vec![
            [255, 0, 0, 255],
            [255, 0, 0, 255],
            [255, 0, 0, 255],
            [0, 0, 255, 255],
        ]
    );
    // the first keyframe keeps its own colour
    let first = scene.keyframes().next().unwrap();
    assert_eq!(first.canvas().style(rect).unwrap().fill_color, Some(Color::RED));
}

#[test]
fn test_group_in_second_keyframe_starts_from_laid_out_position() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = Scene::new(SceneConfig::new(RenderContext::new(10, 10)));
    let canvas = scene.canvas_mut();
    let root = canvas.root();
    canvas.style_mut(root).unwrap().padding = Some(0.0);
    let anchor = canvas.add(root, Object::rect().size(4.0, 4.0), (2.0, 0.0)).unwrap();
    let g = canvas.geometry(anchor).unwrap();
    let offset = diagram_animator::Offset::new(&g.x + &g.width, 0.0);
    let follower = canvas.add(root, Object::rect().size(2.0, 2.0), offset).unwrap();

    scene.keyframe().unwrap();
    scene.add(vec![
        Animation::translate_by(follower, (0.0, 4.0)),
        Animation::fade(anchor, 255, 0),
    ]);
    scene.play(3.0, dir.path().join("group.gif")).unwrap();

    let canvas = scene.canvas();
    let offset = canvas.offset(follower).unwrap();
    assert_eq!((canvas.evaluate(&offset.x), canvas.evaluate(&offset.y)), (6.0, 4.0));
    assert_eq!(canvas.style(anchor).unwrap().alpha, Some(0));
}

#[test]
fn test_scene_without_animations_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nothing.gif");
    let (mut scene, _) = boxed_scene(5, 1.0, (0.0, 0.0));
    assert_eq!(scene.play(10.0, &path).unwrap(), 0);
    assert!(!path.exists());
}

#[test]
fn test_apng_has_animation_control() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blink.apng");
    let (mut scene, rect) = boxed_scene(5, 1.0, (0.0, 0.0));
    scene.add(Animation::fade_out(rect, 255, 0).unwrap());
    scene.play(4.0, &path).unwrap();

    let reader = png::Decoder::new(File::open(&path).unwrap()).read_info().unwrap();
    let control = reader.info().animation_control.as_ref().unwrap();
    assert_eq!(control.num_frames, 4);
    assert_eq!(control.num_plays, 0);
}

#[test]
fn test_gif_decodes_every_frame() {
    use image::AnimationDecoder;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blink.gif");
    let (mut scene, rect) = boxed_scene(5, 1.0, (0.0, 0.0));
    scene.add(Animation::fade_out(rect, 255, 0).unwrap());
    scene.play(3.0, &path).unwrap();

    let file = std::io::BufReader::new(File::open(&path).unwrap());
    let decoder = image::codecs::gif::GifDecoder::new(file).unwrap();
    let frames = decoder.into_frames().collect_frames().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].buffer().dimensions(), (5, 5));
}

#[test]
fn test_single_frame_is_a_still_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    let (mut scene, _) = boxed_scene(5, 1.0, (0.0, 0.0));
    scene.add(Animation::wait(0.1));
    assert_eq!(scene.play(10.0, &path).unwrap(), 1);

    let reader = png::Decoder::new(File::open(&path).unwrap()).read_info().unwrap();
    assert!(reader.info().animation_control.is_none());
}

#[test]
fn test_directory_store_keeps_numbered_frames() {
    let dir = tempfile::tempdir().unwrap();
    let frames_dir = dir.path().join("frames");
    let config = SceneConfig::new(RenderContext::new(5, 5))
        .with_frame_store(FrameStore::Directory(frames_dir.clone()));
    let mut scene = Scene::new(config);
    let root = scene.canvas().root();
    let rect = scene
        .canvas_mut()
        .add(root, Object::rect().size(3.0, 3.0), (0.0, 0.0))
        .unwrap();
    scene.add(Animation::fade_in(rect, 0, 255).unwrap());

    assert_eq!(scene.play(3.0, dir.path().join("out.png")).unwrap(), 3);
    for n in 0..3 {
        assert!(frames_dir.join(format!("frame-{n}.png")).exists());
    }
    assert_eq!(scene.frames().len(), 3);
}

#[test]
fn test_invalid_frame_rate_is_rejected() {
    let (mut scene, rect) = boxed_scene(5, 1.0, (0.0, 0.0));
    scene.add(Animation::fade_in(rect, 0, 255).unwrap());
    let err = scene.play(0.0, "never.gif").unwrap_err();
    assert!(matches!(err, SceneError::Animation(_)));
}
