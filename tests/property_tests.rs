use proptest::prelude::*;

use shiftr::constants::*;
use shiftr::period::{Period, period_from_elevation, progress_from_elevation, progress_from_time};
use shiftr::{
    ColorSetting, CommandTarget, ControlContext, Fader, TimeRange, TransitionScheme, ease_fade, parse_command,
};

fn color_setting() -> impl Strategy<Value = ColorSetting> {
    (
        MIN_TEMP..=MAX_TEMP,
        prop::array::uniform3(MIN_GAMMA..=MAX_GAMMA),
        MIN_BRIGHTNESS..=MAX_BRIGHTNESS,
    )
        .prop_map(|(temperature, gamma, brightness)| ColorSetting::new(temperature, gamma, brightness))
}

fn scheme() -> TransitionScheme {
    TransitionScheme::with_elevation(
        ColorSetting::neutral(),
        ColorSetting::new(3500, [1.0; 3], 0.8),
        3.0,
        -6.0,
    )
    .unwrap()
}

/// Apply `lines` in order and return the resulting scheme.
fn run_commands(current: ColorSetting, lines: &[&str]) -> TransitionScheme {
    let mut scheme = scheme();
    let mut disabled = false;
    let control = ControlContext::new();
    for line in lines {
        let mut target = CommandTarget {
            scheme: &mut scheme,
            current: &current,
            disabled: &mut disabled,
            control: &control,
        };
        parse_command(line.as_bytes(), &mut target);
    }
    scheme
}

fn within(value: f64, a: f64, b: f64) -> bool {
    let eps = 1e-4;
    value >= a.min(b) - eps && value <= a.max(b) + eps
}

proptest! {
    #[test]
    fn prop_interpolate_stays_between_endpoints(
        a in color_setting(),
        b in color_setting(),
        alpha in 0.0f64..=1.0,
    ) {
        let mid = a.interpolate(&b, alpha);
        prop_assert!(within(mid.temperature as f64, a.temperature as f64, b.temperature as f64));
        prop_assert!(within(mid.brightness as f64, a.brightness as f64, b.brightness as f64));
        for i in 0..3 {
            prop_assert!(within(mid.gamma[i] as f64, a.gamma[i] as f64, b.gamma[i] as f64));
        }
    }

    #[test]
    fn prop_interpolate_endpoints_are_exact(a in color_setting(), b in color_setting()) {
        prop_assert_eq!(a.interpolate(&b, 0.0), a);
        prop_assert_eq!(a.interpolate(&b, 1.0), b);
    }

    #[test]
    fn prop_interpolate_clamps_alpha(a in color_setting(), b in color_setting(), alpha in -10.0f64..10.0) {
        let expected = a.interpolate(&b, alpha.clamp(0.0, 1.0));
        prop_assert_eq!(a.interpolate(&b, alpha), expected);
    }

    #[test]
    fn prop_ease_is_non_decreasing(t in 0.0f64..1.0, step in 0.0f64..0.1) {
        let u = (t + step).min(1.0);
        prop_assert!(ease_fade(t) <= ease_fade(u) + 1e-12);
        prop_assert!((0.0..=1.0).contains(&ease_fade(t)));
    }

    #[test]
    fn prop_temp_literal_is_clamped(t in 0u64..100_000) {
        let line = format!("temp {}", t);
        let scheme = run_commands(ColorSetting::neutral(), &[&line]);
        prop_assert!(scheme.has_override(USE_OVERRIDE_TEMP));
        let expected = (t as i64).clamp(MIN_TEMP as i64, MAX_TEMP as i64) as i32;
        prop_assert_eq!(scheme.override_setting.temperature, expected);
    }

    #[test]
    fn prop_temp_huge_literal_saturates(digits in "[1-9][0-9]{19,40}") {
        let line = format!("temp {}", digits);
        let scheme = run_commands(ColorSetting::neutral(), &[&line]);
        prop_assert_eq!(scheme.override_setting.temperature, MAX_TEMP);
        prop_assert_eq!(scheme.day, ColorSetting::neutral());
    }

    #[test]
    fn prop_temp_up_down_round_trip(base in (MIN_TEMP + TEMP_ADJUST)..=(MAX_TEMP - TEMP_ADJUST)) {
        let current = ColorSetting::new(base, [1.0; 3], 1.0);
        let scheme = run_commands(current, &["temp up", "temp down"]);
        prop_assert_eq!(scheme.override_setting.temperature, base);
    }

    #[test]
    fn prop_brightness_literal_is_clamped(b in 0.0f32..5.0) {
        let line = format!("brightness {}", b);
        let scheme = run_commands(ColorSetting::neutral(), &[&line]);
        let stored = scheme.override_setting.brightness;
        prop_assert!((MIN_BRIGHTNESS..=MAX_BRIGHTNESS).contains(&stored));
    }

    #[test]
    fn prop_elevation_progress_matches_period(elevation in -90.0f64..90.0) {
        let (high, low) = (3.0, -6.0);
        let progress = progress_from_elevation(high, low, elevation);
        prop_assert!((0.0..=1.0).contains(&progress));
        match period_from_elevation(high, low, elevation) {
            Period::Night => prop_assert_eq!(progress, 0.0),
            Period::Daytime => prop_assert_eq!(progress, 1.0),
            Period::Transition => prop_assert!(progress >= 0.0 && progress < 1.0),
            Period::None => prop_assert!(false),
        }
    }

    #[test]
    fn prop_time_progress_in_unit_range(offset in 0i32..86_400) {
        let dawn = TimeRange::new(5 * 3600, 7 * 3600);
        let dusk = TimeRange::new(19 * 3600, 21 * 3600);
        let progress = progress_from_time(&dawn, &dusk, offset);
        prop_assert!((0.0..=1.0).contains(&progress));
    }

    #[test]
    fn prop_fade_always_ends_on_target(start in color_setting(), target in color_setting()) {
        let mut fader = Fader::new(true);
        let settle = |fader: &mut Fader, setting: &ColorSetting| {
            let applied = fader.step(setting).0;
            fader.commit_target(setting);
            applied
        };

        settle(&mut fader, &start);
        while fader.is_fading() {
            settle(&mut fader, &start);
        }

        let mut last = settle(&mut fader, &target);
        let mut ticks = 1;
        while fader.is_fading() {
            last = settle(&mut fader, &target);
            ticks += 1;
            prop_assert!(ticks <= FADE_LENGTH + 1);
        }
        prop_assert_eq!(last, target);
    }
}
