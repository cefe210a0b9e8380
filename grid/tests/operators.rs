use orca_core::{glyph, Command, Event, Message, NoteEvent, Position};
use orca_grid::{self as grid, query, Grid, OperatorKind};

fn load(width: u32, height: u32, source: &str) -> Grid {
    let mut grid = Grid::new(width, height);
    grid.load(width, height, source);
    grid
}

fn tick(grid: &mut Grid) -> Vec<Event> {
    let mut events = Vec::new();
    grid::apply(grid, Command::Tick, &mut events);
    events
}

fn queued(events: &[Event]) -> Vec<(Message, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::MessageQueued { message, flush } => Some((message.clone(), *flush)),
            _ => None,
        })
        .collect()
}

#[test]
fn blank_grid_only_advances_frame() {
    let mut grid = Grid::new(4, 3);
    let before = grid.format();

    assert!(grid.parse().is_empty());
    let events = tick(&mut grid);

    assert_eq!(grid.format(), before);
    assert_eq!(grid.frame(), 1);
    assert_eq!(events, vec![Event::FrameAdvanced { frame: 1 }]);
}

#[test]
fn add_on_single_row_grid_writes_nothing() {
    for source in ["1a2", "1A2"] {
        let mut grid = load(3, 1, source);
        let _ = tick(&mut grid);
        assert_eq!(grid.glyph_at(1, 0), source.chars().nth(1).unwrap());
        assert_eq!(grid.to_string(), source);
    }
}

#[test]
fn passive_operators_run_every_tick() {
    let mut grid = load(3, 2, "1A2...");
    let _ = tick(&mut grid);
    assert_eq!(grid.glyph_at(1, 1), '3');

    assert!(grid.write(0, 0, '4'));
    let _ = tick(&mut grid);
    assert_eq!(grid.glyph_at(1, 1), '6');
}

#[test]
fn active_operators_wait_for_a_bang() {
    let mut idle = load(3, 2, "1a2...");
    let _ = tick(&mut idle);
    assert_eq!(idle.glyph_at(1, 1), glyph::EMPTY);

    let mut banged = load(3, 2, "1a*...");
    let _ = tick(&mut banged);
    assert_eq!(banged.glyph_at(1, 1), '1');
}

#[test]
fn clock_outputs_frame_over_rate_modulo() {
    let mut grid = load(3, 2, "2C8...");
    grid.set_frame(4);
    let _ = tick(&mut grid);
    assert_eq!(grid.glyph_at(1, 1), '2');

    let mut flat = load(3, 1, "2C8");
    flat.set_frame(4);
    let _ = tick(&mut flat);
    assert_eq!(flat.to_string(), "2C8");
}

#[test]
fn arithmetic_operators_follow_base36() {
    let cases = [("3B7...", '4'), ("3M4...", 'c'), ("3L7...", '3'), ("3LZ...", '3')];
    for (source, expected) in cases {
        let mut grid = load(3, 2, source);
        let _ = tick(&mut grid);
        assert_eq!(grid.glyph_at(1, 1), expected, "program {source}");
    }

    let mut empty_operand = load(3, 2, "3L....");
    let _ = tick(&mut empty_operand);
    assert_eq!(empty_operand.glyph_at(1, 1), glyph::EMPTY);
}

#[test]
fn sensitive_output_is_uppercased_by_uppercase_operand() {
    let mut grid = load(3, 2, "1AB...");
    let _ = tick(&mut grid);
    assert_eq!(grid.glyph_at(1, 1), 'C');
}

#[test]
fn east_operator_at_edge_explodes() {
    let mut grid = load(3, 1, "..E");
    let events = tick(&mut grid);
    assert_eq!(grid.to_string(), "..*");
    assert!(events.contains(&Event::OperatorExploded {
        position: Position::new(2, 0)
    }));

    let _ = tick(&mut grid);
    assert_eq!(grid.to_string(), "...");
}

#[test]
fn movers_travel_one_cell_per_tick() {
    let mut grid = load(3, 1, "E..");
    let _ = tick(&mut grid);
    assert_eq!(grid.to_string(), ".E.");
    let _ = tick(&mut grid);
    assert_eq!(grid.to_string(), "..E");

    let mut blocked = load(2, 1, "E1");
    let _ = tick(&mut blocked);
    assert_eq!(blocked.to_string(), "*1");

    let mut south = load(1, 3, "S..");
    let _ = tick(&mut south);
    assert_eq!(south.format(), ".\nS\n.\n");
}

#[test]
fn delay_bangs_on_frame_modulo() {
    let mut grid = load(3, 2, ".D4...");
    let mut trace = String::new();
    for _ in 0..5 {
        let _ = tick(&mut grid);
        trace.push(grid.glyph_at(1, 1));
    }
    assert_eq!(trace, "*...*");
}

#[test]
fn uclid_spreads_hits_evenly() {
    let mut grid = load(3, 2, "3U8...");
    let mut trace = String::new();
    for _ in 0..8 {
        let _ = tick(&mut grid);
        trace.push(grid.glyph_at(1, 1));
    }
    assert_eq!(trace, "*..*..*.");
}

#[test]
fn if_bangs_on_equal_operands() {
    let mut equal = load(3, 2, "3F3...");
    let _ = tick(&mut equal);
    assert_eq!(equal.glyph_at(1, 1), glyph::BANG);

    let mut different = load(3, 2, "3F4...");
    let _ = tick(&mut different);
    assert_eq!(different.glyph_at(1, 1), glyph::EMPTY);
}

#[test]
fn lone_bang_erases_itself() {
    let mut grid = load(1, 1, "*");
    let _ = tick(&mut grid);
    assert_eq!(grid.to_string(), ".");
}

#[test]
fn comment_disables_rest_of_row() {
    let mut open = load(4, 2, "#1A2....");
    let _ = tick(&mut open);
    assert_eq!(open.glyph_at(2, 1), glyph::EMPTY);

    let mut closed = load(6, 2, "#1#1A2......");
    let _ = tick(&mut closed);
    assert_eq!(closed.glyph_at(4, 1), '3');
}

#[test]
fn halt_freezes_southward_operator() {
    let mut grid = load(2, 3, "H.E...");
    let _ = tick(&mut grid);
    assert_eq!(grid.format(), "H.\nE.\n..\n");
}

#[test]
fn increment_wraps_at_modulus() {
    let mut grid = load(3, 2, "1I4...");
    let mut trace = String::new();
    for _ in 0..5 {
        let _ = tick(&mut grid);
        trace.push(grid.glyph_at(1, 1));
    }
    assert_eq!(trace, "12301");
}

#[test]
fn lerp_approaches_target() {
    let mut grid = load(3, 2, "2Z5...");
    let mut trace = String::new();
    for _ in 0..4 {
        let _ = tick(&mut grid);
        trace.push(grid.glyph_at(1, 1));
    }
    assert_eq!(trace, "2455");
}

#[test]
fn jumper_passes_value_across_run() {
    let mut grid = load(1, 4, "1JJ.");
    let _ = tick(&mut grid);
    assert_eq!(grid.glyph_at(0, 3), '1');

    let mut jymper = load(4, 1, "1YY.");
    let _ = tick(&mut jymper);
    assert_eq!(jymper.glyph_at(3, 0), '1');
}

#[test]
fn generator_writes_operands_at_offset() {
    let mut grid = load(5, 2, "001G5.....");
    let _ = tick(&mut grid);
    assert_eq!(grid.glyph_at(3, 1), '5');

    let generator = query::operator_at(&grid, Position::new(3, 0)).expect("generator");
    let labels: Vec<_> = generator.ports.iter().map(|port| port.label.as_str()).collect();
    assert_eq!(labels, vec!["G-x", "G-y", "G-len", "G-in0", "G-out0"]);
}

#[test]
fn read_write_push_track_and_query_address_cells() {
    let mut read = load(5, 2, "10O.7.....");
    let _ = tick(&mut read);
    assert_eq!(read.glyph_at(2, 1), '7');

    let mut write = load(4, 3, "10X7........");
    let _ = tick(&mut write);
    assert_eq!(write.glyph_at(3, 1), '7');

    let mut push = load(4, 2, "12P5....");
    let _ = tick(&mut push);
    assert_eq!(push.glyph_at(3, 1), '5');
    assert_eq!(push.glyph_at(2, 1), glyph::EMPTY);

    let mut track = load(5, 2, "12T56.....");
    let _ = tick(&mut track);
    assert_eq!(track.glyph_at(2, 1), '6');

    let mut lookup = load(6, 2, "101Q56......");
    let _ = tick(&mut lookup);
    assert_eq!(lookup.glyph_at(3, 1), '6');
}

#[test]
fn variables_are_visible_to_later_cells_in_the_same_tick() {
    let mut grid = load(3, 3, "1V5.V1...");
    let _ = tick(&mut grid);
    assert_eq!(grid.glyph_at(1, 2), '5');
    assert_eq!(query::variables(&grid).collect::<Vec<_>>(), vec![('1', '5')]);
}

#[test]
fn variables_are_invisible_to_earlier_cells() {
    let mut grid = load(3, 4, ".V1......1V5");
    for _ in 0..3 {
        let _ = tick(&mut grid);
        assert_eq!(grid.glyph_at(1, 1), glyph::EMPTY);
    }
}

#[test]
fn konkat_reads_variables_by_name() {
    let mut grid = load(4, 3, "aV5.1Ka.....");
    let _ = tick(&mut grid);
    assert_eq!(grid.glyph_at(2, 2), '5');
}

#[test]
fn random_stays_in_range_and_replays_with_seed() {
    let sample = |seed| {
        let mut grid = Grid::with_seed(3, 2, seed);
        grid.load(3, 2, "1R3...");
        (0..20)
            .map(|_| {
                let _ = tick(&mut grid);
                grid.glyph_at(1, 1)
            })
            .collect::<String>()
    };

    let first = sample(7);
    assert!(first.chars().all(|glyph| glyph == '1' || glyph == '2'));
    assert_eq!(first, sample(7));
}

#[test]
fn midi_note_is_queued_when_banged() {
    let mut grid = load(5, 2, ".:03C.*...");
    let events = tick(&mut grid);

    let note = NoteEvent {
        channel: 0,
        octave: 3,
        note: 'C',
        velocity: 15,
        length: 1,
    };
    assert_eq!(queued(&events), vec![(Message::Note(note), false)]);
    let emitter = query::operator_at(&grid, Position::new(1, 0)).expect("midi operator");
    assert_eq!(emitter.kind, OperatorKind::MidiNote);
    assert!(!emitter.renderable);

    let events = tick(&mut grid);
    assert!(queued(&events).is_empty());
}

#[test]
fn midi_note_ignores_numeric_note() {
    let mut grid = load(5, 2, ".:035.*...");
    let events = tick(&mut grid);
    assert!(queued(&events).is_empty());
}

#[test]
fn osc_and_udp_read_their_payload() {
    let mut osc = load(4, 2, "=a12*...");
    let events = tick(&mut osc);
    assert_eq!(
        queued(&events),
        vec![(
            Message::Osc {
                path: "/a".to_owned(),
                payload: "12".to_owned(),
            },
            false
        )]
    );

    let mut udp = load(4, 2, ";hi.*...");
    let events = tick(&mut udp);
    assert_eq!(
        queued(&events),
        vec![(
            Message::Udp {
                payload: "hi".to_owned(),
            },
            false
        )]
    );
}

#[test]
fn self_forwards_command_text() {
    let mut grid = load(7, 2, ".$bpm:9.*.....");
    let events = tick(&mut grid);
    assert!(events.contains(&Event::CommandRequested {
        message: "bpm:9".to_owned(),
        origin: Some(Position::new(1, 1)),
    }));
}

#[test]
fn trigger_forces_emitter_and_requests_flush() {
    let mut grid = load(5, 1, ".!1a5");
    let mut events = Vec::new();
    grid::apply(
        &mut grid,
        Command::Trigger {
            position: Position::new(1, 0),
        },
        &mut events,
    );
    assert_eq!(
        queued(&events),
        vec![(
            Message::ControlChange {
                channel: 1,
                knob: 10,
                value: 19,
            },
            true
        )]
    );
}

#[test]
fn write_is_deduplicated() {
    let mut grid = Grid::new(3, 2);
    for y in 0..2 {
        for x in 0..3 {
            for value in 0..i64::from(glyph::RADIX) {
                let glyph = glyph::key_of(value);
                if grid.glyph_at(x, y) == glyph {
                    continue;
                }
                assert!(grid.write(x, y, glyph));
                assert_eq!(grid.glyph_at(x, y), glyph);
                assert!(!grid.write(x, y, glyph));
            }
        }
    }
}

#[test]
fn disallowed_glyph_over_empty_cell_counts_as_a_write() {
    let mut grid = Grid::new(2, 1);
    assert!(grid.write(0, 0, '@'));
    assert_eq!(grid.glyph_at(0, 0), '.');
    assert!(!grid.write(0, 0, '.'));

    assert!(grid.write(1, 0, 'a'));
    assert!(grid.write(1, 0, '@'));
    assert_eq!(grid.glyph_at(1, 0), '.');
}

#[test]
fn block_pads_cells_outside_the_grid() {
    let mut grid = Grid::new(2, 2);
    grid.load(2, 2, "abcd");
    assert_eq!(grid.block(1, 1, 2, 2), "d.\n..\n");
    assert_eq!(grid.block(-1, 0, 2, 1), ".a\n");
    assert_eq!(grid.block(i32::MAX, i32::MAX, 2, 1), "..\n");
    assert_eq!(grid.block(0, 0, u32::MAX, 0), "");
}

#[test]
fn load_then_format_round_trips() {
    let sources = [
        ("1a2", 3, 1),
        ("..#.\nD8.*\n:03C", 4, 3),
        ("$bpm:120\n........", 8, 2),
    ];
    for (source, width, height) in sources {
        let grid = load(width, height, source);
        assert_eq!(grid.format().trim(), source);
    }
}
