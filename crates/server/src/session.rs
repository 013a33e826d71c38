//! One board view bound to a WebSocket connection.
//!
//! Translates client messages into replay-controller operations and builds
//! the state frames the browser renders.

use std::time::Duration;

use chess_core::pgn::format_move_list;
use chess_core::{
    AnalysisRequest, MoveCandidate, Navigation, Orientation, ReplayController, ReplaySnapshot,
    Tick, Timer, TimerId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Dashboard,
    Analysis,
}

impl View {
    fn name(self) -> &'static str {
        match self {
            View::Dashboard => "dashboard",
            View::Analysis => "analysis",
        }
    }
}

/// Client -> server messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Drop {
        from: String,
        to: String,
        #[serde(default)]
        promotion: Option<char>,
    },
    Goto {
        index: isize,
    },
    Start,
    Previous,
    Next,
    End,
    Play,
    Pause,
    Reset,
    Flip,
    LoadPgn {
        pgn: String,
    },
    Analyze,
}

/// Server -> client messages.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    State(BoardState),
    DropResult {
        accepted: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        san: Option<String>,
    },
    LoadResult {
        ok: bool,
        error: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Everything the board page needs to render.
#[derive(Debug, Clone, Serialize)]
pub struct BoardState {
    #[serde(flatten)]
    pub snapshot: ReplaySnapshot,
    pub orientation: Orientation,
    pub move_labels: Vec<String>,
    pub headline: &'static str,
    pub summary: Option<String>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub can_play: bool,
    pub can_analyze: bool,
}

impl BoardState {
    pub fn new(snapshot: ReplaySnapshot, orientation: Orientation) -> Self {
        let len = snapshot.moves.len() as isize;
        let can_go_forward = snapshot.cursor < len - 1;
        Self {
            orientation,
            move_labels: format_move_list(&snapshot.moves),
            headline: snapshot.status.headline(),
            summary: snapshot.status.summary(),
            can_go_back: snapshot.cursor >= 0,
            can_go_forward,
            can_play: can_go_forward && !snapshot.autoplay,
            can_analyze: snapshot.cursor >= 0 && !snapshot.analyzing,
            snapshot,
        }
    }
}

/// Replies to send now, plus analysis work to start in the background.
#[derive(Debug, Default)]
pub struct Outcome {
    pub replies: Vec<ServerMessage>,
    pub analysis: Option<AnalysisRequest>,
}

impl Outcome {
    fn reply(message: ServerMessage) -> Self {
        Self {
            replies: vec![message],
            analysis: None,
        }
    }
}

pub struct BoardSession {
    view: View,
    orientation: Orientation,
    controller: ReplayController,
}

impl BoardSession {
    pub fn new(view: View, timer: impl Timer + 'static, period: Duration) -> Self {
        Self {
            view,
            orientation: Orientation::default(),
            controller: ReplayController::standard(timer).with_period(period),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn controller(&self) -> &ReplayController {
        &self.controller
    }

    pub fn subscribe(&self) -> watch::Receiver<ReplaySnapshot> {
        self.controller.subscribe()
    }

    pub fn state(&self) -> BoardState {
        BoardState::new(self.controller.snapshot(), self.orientation)
    }

    pub fn state_for(&self, snapshot: ReplaySnapshot) -> BoardState {
        BoardState::new(snapshot, self.orientation)
    }

    /// Apply one client message. State frames for controller changes arrive
    /// through the snapshot channel, not in the returned replies.
    pub fn handle(&mut self, message: ClientMessage) -> Outcome {
        match message {
            ClientMessage::Drop { from, to, promotion } => {
                let mut candidate = MoveCandidate::new(&from, &to);
                candidate.promotion = promotion;
                let san = self.controller.apply_move(&candidate).ok();
                Outcome::reply(ServerMessage::DropResult {
                    accepted: san.is_some(),
                    san,
                })
            }
            ClientMessage::Goto { index } => Self::navigated(self.controller.goto_index(index)),
            ClientMessage::Start => Self::navigated(self.controller.goto_start()),
            ClientMessage::Previous => Self::navigated(self.controller.goto_previous()),
            ClientMessage::Next => Self::navigated(self.controller.goto_next()),
            ClientMessage::End => Self::navigated(self.controller.goto_end()),
            ClientMessage::Play => {
                self.controller.start_autoplay();
                Outcome::default()
            }
            ClientMessage::Pause => {
                self.controller.stop_autoplay();
                Outcome::default()
            }
            ClientMessage::Reset => {
                self.controller.reset();
                Outcome::default()
            }
            ClientMessage::Flip => {
                self.orientation = self.orientation.flip();
                Outcome::reply(ServerMessage::State(self.state()))
            }
            ClientMessage::LoadPgn { pgn } => {
                if let Some(rejected) = self.require_analysis_view("load_pgn") {
                    return rejected;
                }
                let reply = match self.controller.load_from_notation(&pgn) {
                    Ok(()) => ServerMessage::LoadResult { ok: true, error: None },
                    Err(e) => ServerMessage::LoadResult {
                        ok: false,
                        error: Some(e.to_string()),
                    },
                };
                Outcome::reply(reply)
            }
            ClientMessage::Analyze => {
                if let Some(rejected) = self.require_analysis_view("analyze") {
                    return rejected;
                }
                if self.controller.is_analyzing() {
                    return Outcome::reply(ServerMessage::Error {
                        message: "Analysis already in progress".to_string(),
                    });
                }
                match self.controller.begin_analysis() {
                    Some(request) => Outcome {
                        replies: Vec::new(),
                        analysis: Some(request),
                    },
                    None => Outcome::reply(ServerMessage::Error {
                        message: crate::clients::gemini::NO_GAME_MESSAGE.to_string(),
                    }),
                }
            }
        }
    }

    pub fn on_tick(&mut self, id: TimerId) -> Tick {
        self.controller.on_tick(id)
    }

    pub fn finish_analysis(&mut self, generation: u64, text: String) -> bool {
        self.controller.finish_analysis(generation, text)
    }

    fn navigated(navigation: Navigation) -> Outcome {
        match navigation {
            Navigation::Recovered(err) => Outcome::reply(ServerMessage::Error {
                message: format!("Board reset to the starting position: {err}"),
            }),
            Navigation::Moved | Navigation::OutOfRange => Outcome::default(),
        }
    }

    fn require_analysis_view(&self, action: &str) -> Option<Outcome> {
        (self.view != View::Analysis).then(|| {
            Outcome::reply(ServerMessage::Error {
                message: format!("{action} is not available in the {} view", self.view.name()),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use chess_core::ManualTimer;
    use serde_json::json;

    use super::*;

    fn session(view: View) -> (BoardSession, ManualTimer) {
        let timer = ManualTimer::new();
        (
            BoardSession::new(view, timer.clone(), Duration::from_millis(1000)),
            timer,
        )
    }

    fn parse(value: serde_json::Value) -> ClientMessage {
        serde_json::from_value(value).unwrap()
    }

    fn drop_move(s: &mut BoardSession, from: &str, to: &str) -> Outcome {
        s.handle(parse(json!({ "type": "drop", "from": from, "to": to })))
    }

    #[test]
    fn test_drop_reports_acceptance() {
        let (mut s, _) = session(View::Dashboard);

        let out = drop_move(&mut s, "e2", "e4");
        assert!(matches!(
            out.replies.as_slice(),
            [ServerMessage::DropResult { accepted: true, san: Some(san) }] if san == "e4"
        ));

        let out = drop_move(&mut s, "e2", "e5");
        assert!(matches!(
            out.replies.as_slice(),
            [ServerMessage::DropResult { accepted: false, san: None }]
        ));
        assert_eq!(s.controller().history(), ["e4"]);
    }

    #[test]
    fn test_navigation_messages() {
        let (mut s, _) = session(View::Dashboard);
        drop_move(&mut s, "e2", "e4");
        drop_move(&mut s, "e7", "e5");

        s.handle(parse(json!({ "type": "start" })));
        assert_eq!(s.controller().cursor(), -1);
        s.handle(parse(json!({ "type": "next" })));
        assert_eq!(s.controller().cursor(), 0);
        s.handle(parse(json!({ "type": "end" })));
        assert_eq!(s.controller().cursor(), 1);
        s.handle(parse(json!({ "type": "previous" })));
        assert_eq!(s.controller().cursor(), 0);

        let out = s.handle(parse(json!({ "type": "goto", "index": 7 })));
        assert!(out.replies.is_empty());
        assert_eq!(s.controller().cursor(), 0);
    }

    #[test]
    fn test_play_and_pause_register_one_timer() {
        let (mut s, timer) = session(View::Dashboard);
        drop_move(&mut s, "e2", "e4");
        s.handle(parse(json!({ "type": "start" })));

        s.handle(parse(json!({ "type": "play" })));
        s.handle(parse(json!({ "type": "play" })));
        assert_eq!(timer.active_count(), 1);
        assert!(!s.state().can_play);

        let id = timer.live()[0];
        assert_eq!(s.on_tick(id), Tick::Advanced(0));
        assert_eq!(s.on_tick(id), Tick::Finished);
        assert_eq!(timer.active_count(), 0);

        s.handle(parse(json!({ "type": "play" })));
        s.handle(parse(json!({ "type": "pause" })));
        assert_eq!(timer.active_count(), 0);
    }

    #[test]
    fn test_flip_replies_with_state() {
        let (mut s, _) = session(View::Dashboard);
        let out = s.handle(parse(json!({ "type": "flip" })));
        match out.replies.as_slice() {
            [ServerMessage::State(state)] => assert_eq!(state.orientation, Orientation::Black),
            other => panic!("unexpected replies: {other:?}"),
        }
    }

    #[test]
    fn test_load_and_analyze_only_in_analysis_view() {
        let (mut s, _) = session(View::Dashboard);
        let out = s.handle(parse(json!({ "type": "load_pgn", "pgn": "1. d4 d5" })));
        assert!(matches!(out.replies.as_slice(), [ServerMessage::Error { .. }]));
        assert!(s.controller().history().is_empty());

        let out = s.handle(parse(json!({ "type": "analyze" })));
        assert!(matches!(out.replies.as_slice(), [ServerMessage::Error { .. }]));
        assert!(out.analysis.is_none());
    }

    #[test]
    fn test_load_pgn_results() {
        let (mut s, _) = session(View::Analysis);

        let out = s.handle(parse(json!({ "type": "load_pgn", "pgn": "1. d4 d5" })));
        assert!(matches!(
            out.replies.as_slice(),
            [ServerMessage::LoadResult { ok: true, error: None }]
        ));
        assert_eq!(s.controller().history(), ["d4", "d5"]);
        assert_eq!(s.controller().cursor(), 1);

        let out = s.handle(parse(json!({ "type": "load_pgn", "pgn": "1. e4 Ke7 Kxe1" })));
        assert!(matches!(
            out.replies.as_slice(),
            [ServerMessage::LoadResult { ok: false, error: Some(_) }]
        ));
        assert_eq!(s.controller().history(), ["d4", "d5"]);
    }

    #[test]
    fn test_analyze_issues_request_and_accepts_result() {
        let (mut s, _) = session(View::Analysis);

        let out = s.handle(parse(json!({ "type": "analyze" })));
        assert!(out.analysis.is_none());

        drop_move(&mut s, "e2", "e4");
        let request = s
            .handle(parse(json!({ "type": "analyze" })))
            .analysis
            .unwrap();
        assert!(request.pgn.contains("1. e4"));
        assert!(s.state().snapshot.analyzing);
        assert!(!s.state().can_analyze);

        let again = s.handle(parse(json!({ "type": "analyze" })));
        assert!(again.analysis.is_none());
        assert!(matches!(
            again.replies.as_slice(),
            [ServerMessage::Error { message }] if message.contains("in progress")
        ));

        assert!(s.finish_analysis(request.generation, "Solid opening.".into()));
        let state = s.state();
        assert_eq!(state.snapshot.analysis.as_deref(), Some("Solid opening."));
        assert!(state.can_analyze);
    }

    #[test]
    fn test_state_frame_shape() {
        let (mut s, _) = session(View::Dashboard);
        drop_move(&mut s, "e2", "e4");
        drop_move(&mut s, "e7", "e5");

        let frame = serde_json::to_value(ServerMessage::State(s.state())).unwrap();
        assert_eq!(frame["type"], "state");
        assert_eq!(frame["cursor"], 1);
        assert_eq!(frame["moves"], json!(["e4", "e5"]));
        assert_eq!(frame["move_labels"], json!(["1. e4", "1... e5"]));
        assert_eq!(frame["orientation"], "white");
        assert_eq!(frame["headline"], "Ongoing");
        assert_eq!(frame["can_go_back"], true);
        assert_eq!(frame["can_go_forward"], false);
        assert_eq!(frame["status"]["kind"], "ongoing");
    }

    #[test]
    fn test_unknown_message_type_is_rejected() {
        let parsed = serde_json::from_value::<ClientMessage>(json!({ "type": "resign" }));
        assert!(parsed.is_err());
    }
}
