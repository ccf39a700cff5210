use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;
use textview_core::{Buffer, ModelError, Region, TextDelta, VersionStamp};

fn random_session(rng: &mut StdRng, buffer: &mut Buffer) -> TextDelta {
    let edit = buffer.begin_edit().unwrap();
    for _ in 0..rng.gen_range(1..4) {
        let size = buffer.size();
        let at = rng.gen_range(0..=size);
        match rng.gen_range(0..3) {
            0 => {
                buffer.insert(&edit, at, "xyz").unwrap();
            }
            1 => {
                let end = rng.gen_range(at..=size);
                buffer.erase(&edit, Region::new(at, end)).unwrap();
            }
            _ => {
                let end = rng.gen_range(at..=size.min(at + 4));
                buffer.replace(&edit, Region::new(at, end), "Q").unwrap();
            }
        }
    }
    buffer.end_edit(edit).unwrap()
}

#[test]
fn test_hello_world_scenario() {
    let mut buffer = Buffer::new("hello world");
    assert_eq!(buffer.change_count(), 0);
    let before = buffer.stamp();

    let edit = buffer.begin_edit().unwrap();
    buffer.insert(&edit, 5, "!").unwrap();
    let delta = buffer.end_edit(edit).unwrap();

    assert_eq!(buffer.text(), "hello! world");
    assert_eq!(buffer.change_count(), 1);
    assert_eq!(delta.version, 1);
    assert_eq!(
        buffer.transform_region_from(Region::new(6, 11), before).unwrap(),
        Region::new(7, 12)
    );
}

#[test]
fn test_session_is_one_version() {
    let mut buffer = Buffer::new("abc");
    let before = buffer.stamp();
    let edit = buffer.begin_edit().unwrap();
    buffer.insert(&edit, 0, "1").unwrap();
    buffer.insert(&edit, 4, "2").unwrap();
    buffer.erase(&edit, Region::new(1, 2)).unwrap();
    buffer.end_edit(edit).unwrap();

    assert_eq!(buffer.text(), "1bc2");
    assert_eq!(buffer.change_count(), 1);
    assert_eq!(buffer.mutation_count(), 3);
    // "bc" grows to cover the text inserted at its end boundary.
    assert_eq!(
        buffer.transform_region_from(Region::new(1, 3), before).unwrap(),
        Region::new(1, 4)
    );
}

#[test]
fn test_token_from_other_buffer_is_rejected() {
    let mut a = Buffer::new("aaa");
    let mut b = Buffer::new("bbb");
    let _edit_a = a.begin_edit().unwrap();
    let edit_b = b.begin_edit().unwrap();

    let err = a.insert(&edit_b, 0, "x").unwrap_err();
    assert!(matches!(err, ModelError::InvalidEditState { .. }));
    assert_eq!(a.text(), "aaa");
}

#[test]
fn test_round_trip_without_edits() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut buffer = Buffer::new("the quick brown fox jumps over the lazy dog");
    for _ in 0..5 {
        random_session(&mut rng, &mut buffer);
    }
    let now = buffer.stamp();
    let region = Region::new(9, 3);
    assert_eq!(buffer.transform_region_from(region, now).unwrap(), region);
    assert_eq!(buffer.mapper().transform_to_head(region, now).unwrap(), region);
}

#[test]
fn test_composition_law() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..50 {
        let mut buffer = Buffer::new("lorem ipsum dolor sit amet, consectetur adipiscing elit");
        let mut stamps: Vec<VersionStamp> = vec![buffer.stamp()];
        let mut sizes = vec![buffer.size()];
        for _ in 0..8 {
            random_session(&mut rng, &mut buffer);
            stamps.push(buffer.stamp());
            sizes.push(buffer.size());
        }
        let mapper = buffer.mapper();

        for _ in 0..20 {
            let v0 = rng.gen_range(0..stamps.len());
            let v1 = rng.gen_range(v0..stamps.len());
            let v2 = rng.gen_range(v1..stamps.len());
            let (s0, s1, s2) = (stamps[v0], stamps[v1], stamps[v2]);
            let size = sizes[v0];
            let region = Region::new(rng.gen_range(0..=size), rng.gen_range(0..=size));

            let direct = mapper.transform_region(region, s0, s2.version()).unwrap();
            let step = mapper.transform_region(region, s0, s1.version()).unwrap();
            let chained = mapper.transform_region(step, s1, s2.version()).unwrap();
            assert_eq!(direct.to_tuple(), chained.to_tuple(), "{region} {v0}->{v1}->{v2}");
        }
    }
}

#[test]
fn test_future_stamp_is_rejected() {
    let mut buffer = Buffer::new("abc");
    let edit = buffer.begin_edit().unwrap();
    buffer.insert(&edit, 0, "x").unwrap();
    buffer.end_edit(edit).unwrap();
    let late = buffer.stamp();

    let mapper = buffer.mapper();
    let early = mapper.stamp_at(0).unwrap();
    assert!(matches!(
        mapper.transform_region(Region::new(0, 1), late, early.version()),
        Err(ModelError::InvalidVersionStamp { .. })
    ));
    assert!(mapper.stamp_at(5).is_err());
}

#[test]
fn test_mapper_reads_from_another_thread() {
    let mut buffer = Buffer::new("0123456789");
    let start = buffer.stamp();
    for i in 0..10 {
        let edit = buffer.begin_edit().unwrap();
        buffer.insert(&edit, 0, &i.to_string()).unwrap();
        buffer.end_edit(edit).unwrap();
    }
    let mapper = buffer.mapper();
    let head = mapper.head_version();

    let reader = thread::spawn(move || mapper.transform_region(Region::new(2, 5), start, head));

    // Appends past the observed head do not affect the reader's range.
    let edit = buffer.begin_edit().unwrap();
    buffer.insert(&edit, 0, "tail").unwrap();
    buffer.end_edit(edit).unwrap();

    let mapped = reader.join().unwrap().unwrap();
    assert_eq!(mapped, Region::new(12, 15));
}

#[test]
fn test_session_delta_replays_on_old_text() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut buffer = Buffer::new("the quick brown fox");
    for _ in 0..50 {
        let before = buffer.text();
        let delta = random_session(&mut rng, &mut buffer);
        assert_eq!(delta.apply_to(&before), Some(buffer.text()));
        assert_eq!(delta.after_char_count, buffer.size());
    }
}
