//! Integration tests for canvas clones and handle forwarding

use diagram_animator::{Canvas, Color, LayoutError, Object, RasterRenderer, RenderContext, Style};
use pretty_assertions::assert_eq;

fn measure() -> RasterRenderer {
    RasterRenderer::new(RenderContext::new(50, 50))
}

fn sample() -> (Canvas, diagram_animator::Handle) {
    let mut canvas = Canvas::default().with_padding(2.0);
    let root = canvas.root();
    let column = canvas.add(root, Object::vlayout(), (0.0, 0.0)).unwrap();
    let style = Style::new().with_fill_color(Color::BLUE);
    let rect = canvas
        .add(column, Object::rect().size(8.0, 6.0).style(style), (0.0, 0.0))
        .unwrap();
    canvas.add(column, Object::rect().size(4.0, 4.0), (0.0, 0.0)).unwrap();
    (canvas, rect)
}

#[test]
fn test_unique_clone_gets_new_identity_and_same_shape() {
    let (mut canvas, rect) = sample();
    canvas.prepare(&measure()).unwrap();
    let (mut copy, cloned) = canvas.clone_object(rect, true).unwrap();
    copy.prepare(&measure()).unwrap();

    assert_ne!(cloned.id(), rect.id());
    assert_eq!(copy.bounds(cloned).unwrap(), canvas.bounds(rect).unwrap());
    assert_eq!(copy.style(cloned).unwrap(), canvas.style(rect).unwrap());
    // the unique copy is not where the original forwards to
    assert_eq!(canvas.forwarded_to(rect).unwrap(), None);
    assert!(copy.latest(rect).is_err());
}

#[test]
fn test_plain_clone_keeps_identity() {
    let (mut canvas, rect) = sample();
    let (copy, cloned) = canvas.clone_object(rect, false).unwrap();

    assert_eq!(cloned, rect);
    assert!(!cloned.same_instance(&rect));
    assert_eq!(canvas.forwarded_to(rect).unwrap(), Some(copy.key()));
    assert!(copy.latest(rect).unwrap().same_instance(&cloned));
}

#[test]
fn test_latest_converges_over_clone_chain() {
    let (mut canvas, rect) = sample();
    let mut chain = vec![canvas.clone_canvas().unwrap()];
    for _ in 0..4 {
        let next = chain.last_mut().unwrap().clone_canvas().unwrap();
        chain.push(next);
    }
    let newest = chain.last().unwrap();
    let handle = newest.latest(rect).unwrap();
    assert_eq!(handle.canvas(), newest.key());
    assert_eq!(handle, rect);
    assert!(newest.contains(rect));

    // each canvas forwards to the one cloned from it
    assert_eq!(canvas.forwarded_to(rect).unwrap(), Some(chain[0].key()));
    for pair in chain.windows(2) {
        assert_eq!(pair[0].forwarded_to(rect).unwrap(), Some(pair[1].key()));
    }
}

#[test]
fn test_clone_solves_independently() {
    let (mut canvas, rect) = sample();
    canvas.prepare(&measure()).unwrap();
    let before = canvas.bounds(rect).unwrap();

    let mut copy = canvas.clone_canvas().unwrap();
    assert_eq!(copy.bounds(rect).unwrap(), before);
    copy.set_width(rect, Some(20.0.into())).unwrap();
    copy.prepare(&measure()).unwrap();

    assert_eq!(copy.bounds(rect).unwrap().width, 20.0);
    assert_eq!(canvas.bounds(rect).unwrap(), before);
    canvas.prepare(&measure()).unwrap();
    assert_eq!(canvas.bounds(rect).unwrap(), before);
}

#[test]
fn test_remove_and_readd_changes_only_the_offset() {
    let mut canvas = Canvas::default().with_padding(0.0);
    let root = canvas.root();
    let rect = canvas.add(root, Object::rect().size(5.0, 3.0), (1.0, 1.0)).unwrap();
    canvas.prepare(&measure()).unwrap();
    let constraints = canvas.solver().len();
    let before = canvas.bounds(rect).unwrap();

    canvas.remove(root, rect).unwrap();
    assert!(!canvas.contains(rect));
    assert!(canvas.solver().len() < constraints);

    canvas.attach(root, rect, (5.0, 1.0)).unwrap();
    canvas.prepare(&measure()).unwrap();
    let after = canvas.bounds(rect).unwrap();
    assert_eq!(canvas.solver().len(), constraints);
    assert_eq!((after.width, after.height, after.y), (before.width, before.height, before.y));
    assert_eq!(after.x, before.x + 4.0);
}

#[test]
fn test_replace_keeps_the_slot() {
    let mut canvas = Canvas::default().with_padding(0.0);
    let root = canvas.root();
    let row = canvas.add(root, Object::hlayout(), (0.0, 0.0)).unwrap();
    let first = canvas.add(row, Object::rect().size(4.0, 4.0), (0.0, 0.0)).unwrap();
    let last = canvas.add(row, Object::rect().size(4.0, 4.0), (0.0, 0.0)).unwrap();
    let wide = canvas.insert(Object::rect().size(10.0, 4.0));

    canvas.replace(first, wide).unwrap();
    canvas.prepare(&measure()).unwrap();
    assert_eq!(canvas.children(row).unwrap(), vec![wide, last]);
    assert_eq!(canvas.parent(first).unwrap(), None);
    assert_eq!(canvas.bounds(last).unwrap().x, 10.0);
}

#[test]
fn test_copy_subtree_remaps_internal_references() {
    let mut canvas = Canvas::default().with_padding(0.0);
    let root = canvas.root();
    let group = canvas.insert(Object::group());
    let base = canvas.add(group, Object::rect().size(4.0, 4.0), (0.0, 0.0)).unwrap();
    let g = canvas.geometry(base).unwrap();
    canvas
        .add(group, Object::rect().size(&g.width, 2.0), (0.0, 4.0))
        .unwrap();
    canvas.attach(root, group, (0.0, 0.0)).unwrap();

    let copy = canvas.copy_subtree(group, true).unwrap();
    canvas.attach(root, copy, (10.0, 0.0)).unwrap();
    canvas.set_width(base, Some(6.0.into())).unwrap();
    canvas.prepare(&measure()).unwrap();

    let copied = canvas.children(copy).unwrap();
    assert_ne!(copied[0], base);
    assert_eq!(canvas.bounds(copied[0]).unwrap().x, 10.0);
    // the copied follower tracks the copied base, not the original
    assert_eq!(canvas.bounds(copied[1]).unwrap().width, 4.0);
    assert_eq!(canvas.bounds(canvas.children(group).unwrap()[1]).unwrap().width, 6.0);
}

#[test]
fn test_handle_from_unrelated_canvas_is_stale() {
    let (canvas, _) = sample();
    let (mut other, foreign) = sample();

    let err = canvas.bounds(foreign).unwrap_err();
    assert!(matches!(err, LayoutError::StaleHandle { .. }));
    // a clone's own handles do not resolve on the canvas it came from
    let mut copy = other.clone_canvas().unwrap();
    let root = copy.root();
    let fresh = copy.add(root, Object::rect(), (0.0, 0.0)).unwrap();
    assert!(matches!(other.latest(fresh), Err(LayoutError::StaleHandle { .. })));
    assert!(canvas.latest(other.root()).is_err());
}
