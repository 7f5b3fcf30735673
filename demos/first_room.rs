/// First Room demo — a scripted baseline playthrough.
///
/// The player ignores the narrator twice, finds a page of lore and lingers
/// long enough for the disguise to slip, then the ending forces the reveal.
///
/// Run with: cargo run --example first_room

use narrator_engine::core::scheduler::SchedulerEvent;
use narrator_engine::schema::game_state::GameSnapshot;
use narrator_engine::NarratorSession;

const FRAME_MS: u64 = 16;

fn main() {
    let mut session = NarratorSession::builder()
        .era(1)
        .seed(2026)
        .content_file("content/narrator.ron")
        .config_file("content/config.ron")
        .build()
        .expect("Failed to build narrator session");

    let mut game = GameSnapshot::new();
    game.enter("cell");

    println!("=== The First Room ===\n");

    // --- Intro: chained lines, typed in the inner voice ---
    session.say("intro", &game);
    run(&mut session, &game, 6_000);

    // --- Twice the player goes right ---
    for _ in 0..2 {
        session.record_decision("go_left", "went_right", false);
        session.add_awareness(1, "defiance", &game);
        session.say("went_right", &game);
        run(&mut session, &game, 3_000);
    }

    // --- Lore ---
    session.tracker_mut().mark_lore_found("diary_1");
    session.add_awareness(2, "lore", &game);
    session.say("lore_found", &game);
    run(&mut session, &game, 6_000);

    // --- Lingering: play time adds its own awareness ---
    game.play_seconds = 900;
    session.say("go_left", &game);
    run(&mut session, &game, 4_000);

    // --- Ending ---
    session.open_reveal_gate();
    session.force_full_reveal(&game);
    run(&mut session, &game, 10_000);

    println!(
        "\nFinal awareness: {:?} ({} points), mode {:?}",
        session.level(),
        session.points(),
        session.mode()
    );
}

/// Step the session frame by frame, printing each line as it finishes.
fn run(session: &mut NarratorSession, game: &GameSnapshot, duration_ms: u64) {
    let mut elapsed = 0;
    while elapsed < duration_ms {
        session.tick(FRAME_MS, game);
        elapsed += FRAME_MS;
        for event in session.drain_events() {
            match event {
                SchedulerEvent::LineCompleted { handle, .. } | SchedulerEvent::LineInterrupted { handle, .. } => {
                    if let Some(line) = session.visible_lines().into_iter().find(|l| l.handle == handle) {
                        println!("[{}] {}", line.mood.as_str(), line.text);
                    }
                }
                SchedulerEvent::ModeChanged { mode } => println!("  (mode: {:?})", mode),
                _ => {}
            }
        }
    }
}
