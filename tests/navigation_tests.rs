// tests/navigation_tests.rs
use automon_core::{AssetId, Error, Frame, Point};
use automon_cv::{DetectionConfig, Detector, Template, TemplateStore};
use automon_nav::source::Advance;
use automon_nav::{
    FollowOptions, InputEvent, NavigationConfig, Navigator, ReplaySource, Sequence, SequenceBook, Step, WaitOptions,
};
use image::{Rgb, RgbImage};
use std::time::{Duration, Instant};

fn marker(seed: u32) -> RgbImage {
    let mut state = seed;
    RgbImage::from_fn(8, 8, |_, _| {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let v = (state >> 16) as u8;
        Rgb([v, 255 - v, v.rotate_left(1)])
    })
}

fn screen(placed: &[(&RgbImage, u32, u32)]) -> Frame {
    let mut image = RgbImage::from_pixel(80, 60, Rgb([25, 25, 25]));
    for (img, x, y) in placed {
        image::imageops::replace(&mut image, *img, *x as i64, *y as i64);
    }
    Frame::new(image)
}

fn store() -> TemplateStore {
    TemplateStore::from_templates([
        Template::new(AssetId::new("a.png"), marker(100)),
        Template::new(AssetId::new("b.png"), marker(200)),
        Template::new(AssetId::new("home.png"), marker(300)),
    ])
}

fn navigator(source: ReplaySource, config: NavigationConfig) -> Navigator<ReplaySource> {
    let detector = Detector::new(DetectionConfig::default(), store());
    Navigator::new(source, detector, config).unwrap()
}

fn step(name: &str) -> Option<Step> {
    Some(Step::from(AssetId::new(name)))
}

#[test]
fn test_wait_for_times_out() {
    let config = NavigationConfig {
        poll_interval_ms: 50,
        ..NavigationConfig::fast()
    };
    let mut nav = navigator(ReplaySource::new(vec![screen(&[])]), config);

    let timeout = Duration::from_millis(150);
    let start = Instant::now();
    let found = nav.wait_for(&[AssetId::new("a.png")], WaitOptions::new(timeout)).unwrap();
    let elapsed = start.elapsed();

    assert!(!found);
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_millis(50 + 250), "took {:?}", elapsed);
}

#[test]
fn test_wait_for_finds_late_asset() {
    let a = marker(100);
    let frames = vec![screen(&[]), screen(&[]), screen(&[(&a, 30, 30)])];
    let mut nav = navigator(ReplaySource::new(frames), NavigationConfig::fast());

    let found = nav
        .wait_for(&[AssetId::new("a.png")], WaitOptions::new(Duration::from_secs(2)).raise())
        .unwrap();
    assert!(found);
    assert_eq!(nav.source().captures(), 3);
}

#[test]
fn test_follow_sequence_reports_failing_step() {
    let a = marker(100);
    let source = ReplaySource::new(vec![screen(&[(&a, 10, 10)])]);
    let mut nav = navigator(source, NavigationConfig::fast());
    let sequence = Sequence::new("a_b", vec![step("a.png"), step("b.png"), None]).unwrap();

    let options = FollowOptions::new(Duration::from_millis(30)).max_tries(2).raise();
    let err = nav.follow_sequence(&sequence, options).unwrap_err();
    match err {
        Error::FollowSequence { step, assets, tries } => {
            assert_eq!(step, 0);
            assert_eq!(assets, "a.png");
            assert_eq!(tries, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    // one click on `a` per attempt
    assert_eq!(nav.source().taps().collect::<Vec<_>>(), vec![(14, 14), (14, 14)]);
}

#[test]
fn test_cancel_aborts_wait() {
    let mut nav = navigator(ReplaySource::new(vec![screen(&[])]), NavigationConfig::default());
    let control = nav.control().clone();

    let host = control.clone();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(120));
        host.cancel();
    });

    let start = Instant::now();
    let err = nav
        .wait_for(&[AssetId::new("a.png")], WaitOptions::new(Duration::from_secs(30)))
        .unwrap_err();
    let elapsed = start.elapsed();
    canceller.join().unwrap();

    assert!(err.is_cancelled());
    assert!(elapsed < Duration::from_millis(120 + 100 + 200), "took {:?}", elapsed);
    assert!(!control.is_cancel_requested());
}

#[test]
fn test_skip_ad_until_landmark() {
    let home = marker(300);
    let mut frames: Vec<Frame> = (0..6).map(|_| screen(&[])).collect();
    frames.push(screen(&[(&home, 4, 4)]));

    let config = NavigationConfig {
        in_app_assets: vec![AssetId::new("home.png")],
        horizontal_ad_spots: vec![Point::new(70, 5), Point::new(72, 8)],
        ..NavigationConfig::fast()
    };
    let bound = config.max_ad_iterations() + 1;
    let mut nav = navigator(ReplaySource::new(frames), config);

    assert!(nav.skip_ad().unwrap());
    let taps = nav.source().taps().count();
    assert!(taps <= bound, "{} taps", taps);
    assert!(nav.source().events().contains(&InputEvent::Back));
    // back in the application, nothing left to skip
    assert!(!nav.skip_ad().unwrap());
}

#[test]
fn test_replay_directory_with_sequence_book() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (a, b) = (marker(100), marker(200));
    let shots = [screen(&[(&a, 20, 20)]), screen(&[(&b, 50, 30)])];
    for (i, frame) in shots.iter().enumerate() {
        // device-native 1280x720 so frames stay unscaled
        let mut native = RgbImage::from_pixel(1280, 720, Rgb([25, 25, 25]));
        image::imageops::replace(&mut native, frame.image(), 0, 0);
        native.save(dir.path().join(format!("{:03}.png", i)))?;
    }

    let book = SequenceBook::from_json(r#"{ "a_then_b": ["a.png", ["home.png", "b.png"], null] }"#)?;
    let detector = Detector::new(
        DetectionConfig::default(),
        TemplateStore::from_templates([
            Template::new(AssetId::new("a.png"), a).with_region(automon_core::Region::TOP_LEFT),
            Template::new(AssetId::new("b.png"), b).with_region(automon_core::Region::TOP_LEFT),
            Template::new(AssetId::new("home.png"), marker(300)).with_region(automon_core::Region::TOP_LEFT),
        ]),
    );
    let sequence = book.sequence("a_then_b", detector.store())?;

    let source = ReplaySource::from_dir(dir.path())?.with_advance(Advance::OnInput);
    let mut nav = Navigator::new(source, detector, NavigationConfig::fast())?;
    assert!(nav.follow_sequence(&sequence, FollowOptions::new(Duration::from_millis(200)))?);
    assert_eq!(nav.source().taps().collect::<Vec<_>>(), vec![(24, 24), (54, 34)]);
    Ok(())
}

#[test]
fn test_cancel_is_prompt_on_full_frames() {
    let background = RgbImage::from_fn(1280, 720, |x, y| Rgb([(x % 17 * 15) as u8, (y % 11 * 23) as u8, 90]));
    let mut nav = navigator(ReplaySource::new(vec![Frame::new(background)]), NavigationConfig::fast());
    let host = nav.control().clone();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(120));
        host.cancel();
    });

    let start = Instant::now();
    let err = nav
        .wait_for(&[AssetId::new("a.png")], WaitOptions::new(Duration::from_secs(30)))
        .unwrap_err();
    let elapsed = start.elapsed();
    canceller.join().unwrap();

    assert!(err.is_cancelled());
    assert!(elapsed < Duration::from_millis(1200), "took {:?}", elapsed);
}
