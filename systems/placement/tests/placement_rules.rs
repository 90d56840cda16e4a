use endless_runway_core::{
    Command, GapLength, GenerationConfig, HeightLevel, HeightLockSetting, InstanceId, Placement,
    SegmentDescriptor, SegmentName, SegmentSpec, SegmentType, SpawnKind, Vec2,
};
use endless_runway_system_placement::{place_at_origin, PlacementCalculator};
use endless_runway_world::{apply, query, Level};

const MEDIUM: f32 = 4.0;

fn segment_entry(
    name: &str,
    segment_type: SegmentType,
    height_lock: HeightLockSetting,
) -> SegmentSpec {
    SegmentSpec {
        name: SegmentName::new(name),
        segment_type,
        height_lock,
        unlock_difficulty: 0,
        weight: 10,
        entry_anchor: Vec2::new(-2.0, 0.0),
        exit_anchor: Vec2::new(6.0, 0.0),
    }
}

fn level_with(configure: impl FnOnce(&mut GenerationConfig)) -> Level {
    let mut config = GenerationConfig {
        segments: vec![
            segment_entry("flat", SegmentType::Ground, HeightLockSetting::None),
            segment_entry("flat_locked", SegmentType::Ground, HeightLockSetting::LockToNext),
            segment_entry("ramp", SegmentType::Transition, HeightLockSetting::None),
            segment_entry("pit", SegmentType::Jumper, HeightLockSetting::None),
        ],
        ..GenerationConfig::default()
    };
    configure(&mut config);
    Level::new(config, MEDIUM).expect("level")
}

fn level() -> Level {
    level_with(|_| {})
}

fn commit(level: &mut Level, id: u32, name: &str, placement: Placement) {
    let mut events = Vec::new();
    apply(
        level,
        Command::PlaceSegment {
            instance: InstanceId::new(id),
            name: SegmentName::new(name),
            placement,
            kind: SpawnKind::Ordinary,
        },
        &mut events,
    )
    .expect("placement applies");
    apply(
        level,
        Command::RecycleSegment {
            instance: InstanceId::new(id),
        },
        &mut events,
    )
    .expect("recycle applies");
}

fn descriptor(level: &Level, name: &str) -> SegmentDescriptor {
    query::catalog(level)
        .descriptor(&SegmentName::new(name))
        .expect("catalogued")
        .clone()
}

#[test]
fn transition_gets_no_gap_after_every_type() {
    for predecessor in ["flat", "ramp", "pit"] {
        let mut level = level();
        let mut calculator = PlacementCalculator::new(5);
        let flat = descriptor(&level, "flat");
        let first = calculator.place_next(&level, &flat);
        commit(&mut level, 0, "flat", first);

        let before = calculator.place_next(&level, &descriptor(&level, predecessor));
        commit(&mut level, 1, predecessor, before);
        if predecessor == "pit" {
            assert_eq!(query::current_gap(&level), GapLength::Medium);
        }

        let ramp = descriptor(&level, "ramp");
        for _ in 0..1_000 {
            let placement = calculator.place_next(&level, &ramp);
            assert_eq!(placement.gap, GapLength::NoGap, "after {predecessor}");
            assert_eq!(placement.gap_distance, 0.0, "after {predecessor}");
        }
    }
}

#[test]
fn jumper_uses_medium_gap_distance() {
    let mut level = level();
    let mut calculator = PlacementCalculator::new(5);
    let flat = descriptor(&level, "flat");
    let first = calculator.place_next(&level, &flat);
    commit(&mut level, 0, "flat", first);

    let placement = calculator.place_next(&level, &descriptor(&level, "pit"));
    assert_eq!(placement.gap, GapLength::Medium);
    assert_eq!(placement.gap_distance, MEDIUM);
}

#[test]
fn entry_anchor_lands_on_previous_exit_plus_gap() {
    let mut level = level();
    let mut calculator = PlacementCalculator::new(12);
    let flat = descriptor(&level, "flat");

    let first = calculator.place_next(&level, &flat);
    assert_eq!(first.position, Vec2::new(2.0, 0.0));
    commit(&mut level, 0, "flat", first);

    let exit_x = query::current_segment(&level).expect("current").exit_position().x;
    assert_eq!(exit_x, 8.0);

    for id in 1..50 {
        let placement = calculator.place_next(&level, &flat);
        let previous = query::current_segment(&level).expect("current").clone();
        let entry_x = placement.position.x + flat.entry_anchor().x;
        assert!((entry_x - (previous.exit_position().x + placement.gap_distance)).abs() < 1e-4);
        let expected_y = previous.position.y + placement.height_delta;
        assert!((placement.position.y - expected_y).abs() < 1e-4);
        commit(&mut level, id, "flat", placement);
    }
}

#[test]
fn jumper_predecessor_carries_gap_over() {
    let mut level = level();
    let mut calculator = PlacementCalculator::new(77);
    let flat = descriptor(&level, "flat");
    let pit = descriptor(&level, "pit");

    let first = calculator.place_next(&level, &flat);
    commit(&mut level, 0, "flat", first);
    let jump = calculator.place_next(&level, &pit);
    commit(&mut level, 1, "pit", jump);
    assert_eq!(query::current_gap(&level), GapLength::Medium);

    // A ground segment after a jumper keeps the jumper's medium gap.
    for _ in 0..100 {
        let placement = calculator.place_next(&level, &flat);
        assert_eq!(placement.gap, GapLength::Medium);
        assert_eq!(placement.gap_distance, MEDIUM);
    }
}

#[test]
fn override_forces_shortest_distance_but_keeps_rule_choice() {
    let mut level = level_with(|config| config.gaps.override_to_shortest = true);
    let mut calculator = PlacementCalculator::new(3);
    let flat = descriptor(&level, "flat");
    let first = calculator.place_next(&level, &flat);
    commit(&mut level, 0, "flat", first);

    let shortest = query::config(&level).gaps.shortest;
    let placement = calculator.place_next(&level, &descriptor(&level, "pit"));
    assert_eq!(placement.gap, GapLength::Medium);
    assert_eq!(placement.gap_distance, shortest);
}

#[test]
fn height_walk_stays_within_bounds() {
    let mut calculator = PlacementCalculator::new(2024);
    let mut height = HeightLevel::LOWEST;
    let mut visited = [false; 3];
    for _ in 0..10_000 {
        let next = calculator.step_height(height, 3);
        assert!((1..=3).contains(&next.get()));
        assert!(next.get().abs_diff(height.get()) <= 1);
        visited[(next.get() - 1) as usize] = true;
        height = next;
    }
    assert!(visited.iter().all(|hit| *hit));
}

#[test]
fn locked_predecessor_keeps_height() {
    let mut level = level();
    let mut calculator = PlacementCalculator::new(9);
    let locked = descriptor(&level, "flat_locked");
    let first = calculator.place_next(&level, &locked);
    commit(&mut level, 0, "flat_locked", first);

    for _ in 0..200 {
        let placement = calculator.place_next(&level, &descriptor(&level, "flat"));
        assert_eq!(placement.height_delta, 0.0);
        assert_eq!(placement.height_level, query::height_level(&level));
    }
}

#[test]
fn height_offset_follows_interval() {
    let mut level = level();
    let mut calculator = PlacementCalculator::new(31);
    let flat = descriptor(&level, "flat");
    let interval = query::config(&level).heights.interval;

    let first = calculator.place_next(&level, &flat);
    commit(&mut level, 0, "flat", first);
    for id in 1..500 {
        let before = query::height_level(&level).get() as f32;
        let placement = calculator.place_next(&level, &flat);
        let after = placement.height_level.get() as f32;
        assert!((placement.height_delta - (after - before) * interval).abs() < 1e-4);
        commit(&mut level, id, "flat", placement);
    }
}

#[test]
fn forced_placement_snaps_height_to_baseline_tier() {
    let mut level = level();
    let mut calculator = PlacementCalculator::new(4);
    let flat = descriptor(&level, "flat");
    let origin = place_at_origin(&level, &flat);
    commit(&mut level, 0, "flat", origin);

    let ramp = descriptor(&level, "ramp");
    let placement = calculator.place_forced(&level, &ramp, 1.5);
    assert_eq!(placement.position.y, 1.5);
    assert_eq!(placement.gap, GapLength::NoGap);
    assert_eq!(placement.height_level.get(), 2);

    let above = calculator.place_forced(&level, &ramp, 7.5);
    assert_eq!(above.position.y, 7.5);
    assert_eq!(above.height_level.get(), 3);
}

#[test]
fn heights_stay_on_tiers_after_forced_baseline() {
    let mut level = level();
    let mut calculator = PlacementCalculator::new(77);
    let flat = descriptor(&level, "flat");
    let config = query::config(&level);
    let levels = config.heights.levels;
    let interval = config.heights.interval;
    let baseline = config.origin.y;
    let top = baseline + (levels - 1) as f32 * interval;

    let first = calculator.place_next(&level, &flat);
    commit(&mut level, 0, "flat", first);
    let mut id = 1;
    while query::height_level(&level).get() < levels {
        let placement = calculator.place_next(&level, &flat);
        commit(&mut level, id, "flat", placement);
        id += 1;
        assert!(id < 10_000, "height walk never reached the top tier");
    }

    let forced = calculator.place_forced(&level, &flat, baseline);
    assert_eq!(forced.height_level, HeightLevel::LOWEST);
    commit(&mut level, id, "flat", forced);

    for next in id + 1..id + 500 {
        let placement = calculator.place_next(&level, &flat);
        let y = placement.position.y;
        assert!(
            y >= baseline - 1e-4 && y <= top + 1e-4,
            "y {y} left the tier range"
        );
        let tier_y = baseline + (placement.height_level.get() - 1) as f32 * interval;
        assert!((y - tier_y).abs() < 1e-4);
        commit(&mut level, next, "flat", placement);
    }
}
