use ndarray::{Array2, arr2};

use lightstage::{ChannelContainer, array_io, extract_depth, extract_normal};

const BG: f32 = 3.0e38; // background depth sentinel: the raster maximum

fn replicated(values: &Array2<f32>) -> ChannelContainer {
    ChannelContainer::from_channels(
        ["R", "G", "B"].map(|n| (n.to_string(), values.clone())),
    )
    .unwrap()
}

#[test]
fn depth_extraction_writes_a_four_channel_array_and_a_bounded_visualization() {
    let dir = tempfile::tempdir().unwrap();
    let out_npy = dir.path().join("depth.npy");
    let out_png = dir.path().join("depth.png");

    let depth = replicated(&arr2(&[[1.0f32, 2.0], [3.0, BG]]));
    let alpha = replicated(&arr2(&[[1.0f32, 1.0], [0.5, 0.0]]));

    let combined = extract_depth(&depth, &alpha, &out_npy, Some(&out_png)).unwrap();
    assert_eq!(combined.dim(), (2, 2, 4));

    let back = array_io::load_npy(&out_npy).unwrap();
    assert_eq!(back, combined);

    let png = image::open(&out_png).unwrap().into_luma8();
    assert!(png.pixels().all(|p| p.0[0] <= 255));
    // Closest pixel is brightest, background pixel (alpha 0) is pure black.
    assert_eq!(png.get_pixel(0, 0).0[0], 255);
    assert_eq!(png.get_pixel(1, 1).0[0], 0);
}

#[test]
fn normal_visualization_of_a_viewer_facing_normal() {
    let dir = tempfile::tempdir().unwrap();
    let out_npy = dir.path().join("normal.npy");
    let out_png = dir.path().join("normal.png");

    // A single pixel with normal (0, 0, 1), fully covered.
    let container = ChannelContainer::from_channels([
        ("R".to_string(), arr2(&[[0.0f32]])),
        ("G".to_string(), arr2(&[[0.0f32]])),
        ("B".to_string(), arr2(&[[1.0f32]])),
        ("A".to_string(), arr2(&[[1.0f32]])),
    ])
    .unwrap();

    extract_normal(&container, &out_npy, Some(&out_png)).unwrap();

    // x, y components: (1 - (0/2 + 0.5)) * 255 = 127.5, truncated to 127;
    // z component: (1 - (1/2 + 0.5)) * 255 = 0.
    let png = image::open(&out_png).unwrap().into_rgb8();
    assert_eq!(png.get_pixel(0, 0).0, [127, 127, 0]);
}

#[test]
fn zero_alpha_normals_render_black() {
    let dir = tempfile::tempdir().unwrap();
    let out_png = dir.path().join("normal.png");

    let container = ChannelContainer::from_channels([
        ("R".to_string(), arr2(&[[-1.0f32]])),
        ("G".to_string(), arr2(&[[1.0f32]])),
        ("B".to_string(), arr2(&[[-1.0f32]])),
        ("A".to_string(), arr2(&[[0.0f32]])),
    ])
    .unwrap();

    extract_normal(&container, &dir.path().join("normal.npy"), Some(&out_png)).unwrap();

    let png = image::open(&out_png).unwrap().into_rgb8();
    assert_eq!(png.get_pixel(0, 0).0, [0, 0, 0]);
}

#[test]
fn depth_and_alpha_shapes_must_agree() {
    let dir = tempfile::tempdir().unwrap();
    let depth = replicated(&Array2::from_elem((2, 2), 1.0f32));
    let alpha = replicated(&Array2::from_elem((2, 3), 1.0f32));
    assert!(extract_depth(&depth, &alpha, &dir.path().join("d.npy"), None).is_err());
}
