//! Minimal Parlor host.
//!
//! Seeds one demo session — four guests, two rounds, a small prop pool and
//! prepared hints — and serves it on a local WebSocket. Clients connect,
//! send an `identify` frame, and watch the party unfold as the facilitator
//! drives the director (here: a scripted tour through round 1).

use parlor::{
    HintTier, Importance, ParlorError, ParlorServer, PlayerId, PropId, SessionId, StubNarrator,
};
use parlor_state::{PlayerRole, PreparedRound, Prop, RoundPlan, RoundSpec};

#[tokio::main]
async fn main() -> Result<(), ParlorError> {
    parlor::init_tracing();

    let server = ParlorServer::<StubNarrator>::builder()
        .bind("127.0.0.1:8080")
        .data_dir("data/sessions")
        .build(StubNarrator)
        .await?;
    let director = server.director();

    // Seed the demo party.
    let session_id = SessionId::new("demo");
    let session = director.session(&session_id);
    {
        let mut state = session.lock().await;
        if state.players.is_empty() {
            for name in ["ada", "bruno", "cleo", "dmitri"] {
                state.add_player(PlayerId::new(name), name);
            }
            state.player_mut(&PlayerId::new("dmitri")).unwrap().role = PlayerRole::Culprit;
            state.killer.destroy_quota = 2;
            state.plan = RoundPlan {
                rounds: vec![
                    RoundSpec {
                        code: "quiz".into(),
                        theme: Some("the locked study".into()),
                        intro: Some("A storm rattles the windows.".into()),
                        outro: None,
                        max_secs: Some(180),
                    },
                    RoundSpec {
                        code: "seance".into(),
                        theme: None,
                        intro: None,
                        outro: None,
                        max_secs: None,
                    },
                ],
            };
            for (id, importance) in [
                ("env1", Importance::High),
                ("env2", Importance::High),
                ("env3", Importance::Medium),
                ("env4", Importance::Low),
            ] {
                state.props.push(Prop {
                    id: PropId::new(id),
                    importance,
                    assigned_to: None,
                });
            }
            state.prepared.insert(
                1,
                PreparedRound {
                    hints: [
                        (HintTier::Major, "The will was rewritten on Friday.".to_owned()),
                        (HintTier::Vague, "Papers rustle behind the study door.".to_owned()),
                    ]
                    .into_iter()
                    .collect(),
                    sharing_rules: [(HintTier::Major, HintTier::Vague)].into_iter().collect(),
                    intro: None,
                    outro: None,
                },
            );
        }
    }

    let report = director.distribute_props(&session_id).await;
    tracing::info!(
        assigned = report.assigned,
        left = report.left,
        "demo props distributed"
    );

    // Script a first round so connecting clients see traffic right away.
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        if director.begin_next_round(&session_id).await.is_ok() {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            let _ = director.confirm_start(&session_id).await;
        }
    });

    tracing::info!(addr = ?server.local_addr().ok(), "parlor host ready");
    server.run().await
}
