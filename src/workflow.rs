//! Operator workflow as an explicit state machine.
//!
//! [`transition`] is pure: every stage carries the data it needs (settings,
//! background, reference) and the next stage is computed from the current
//! one and an [`Event`]. [`Session`] drives the machine against a
//! [`FrameSource`], turning key presses into captures and inspections.

use crate::capture::FrameSource;
use crate::config::{InspectionConfig, ThresholdStrategy};
use crate::error::Result;
use crate::models::{ColorSequence, Inspection};
use crate::pipeline::InspectionPipeline;
use image::RgbImage;

/// Answers given while configuring a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub height_greater_than_width: bool,
    pub use_background: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Yes,
    No,
    Enter,
    Retake,
    Quit,
    Other,
}

impl Key {
    /// Map a terminal line to a key; an empty line is Enter.
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "" => Key::Enter,
            "y" | "Y" => Key::Yes,
            "n" | "N" => Key::No,
            "r" | "R" => Key::Retake,
            "q" | "Q" | "\u{1b}" => Key::Quit,
            _ => Key::Other,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Key(Key),
    BackgroundCaptured(RgbImage),
    ReferenceFound(ColorSequence),
}

#[derive(Debug, Clone)]
pub enum Stage {
    AskOrientation,
    AskBackground {
        height_greater_than_width: bool,
    },
    CaptureBackground {
        settings: Settings,
    },
    ConfirmBackground {
        settings: Settings,
        background: RgbImage,
    },
    CaptureReference {
        settings: Settings,
        background: Option<RgbImage>,
    },
    ConfirmReference {
        settings: Settings,
        background: Option<RgbImage>,
        reference: ColorSequence,
    },
    Check {
        settings: Settings,
        background: Option<RgbImage>,
        reference: ColorSequence,
    },
    Exit,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::AskOrientation | Stage::AskBackground { .. } => "initialize",
            Stage::CaptureBackground { .. } | Stage::ConfirmBackground { .. } => "background capture",
            Stage::CaptureReference { .. } | Stage::ConfirmReference { .. } => "reference capture",
            Stage::Check { .. } => "check",
            Stage::Exit => "exit",
        }
    }

    /// Question and accepted keys shown to the operator.
    pub fn prompt(&self) -> &'static str {
        match self {
            Stage::AskOrientation => "Is the connector height greater than its width? [y] Yes [n] No [q] Quit",
            Stage::AskBackground { .. } => "Threshold against a captured background? [y] Yes [n] No [q] Quit",
            Stage::CaptureBackground { .. } => "Clear the view. [Enter] Capture background [q] Quit",
            Stage::ConfirmBackground { .. } => "Accept captured background? [y] Yes [n] No [q] Quit",
            Stage::CaptureReference { .. } => "Insert reference wire assy. [Enter] Capture [q] Quit",
            Stage::ConfirmReference { .. } => "Accept captured reference? [y] Yes [n] No [q] Quit",
            Stage::Check { .. } => "Insert wire assy. [Enter] Check [r] Retake reference [n] New config [q] Quit",
            Stage::Exit => "",
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Stage::Exit)
    }
}

/// Next stage after `event`. Events a stage does not accept leave it unchanged.
pub fn transition(stage: Stage, event: Event) -> Stage {
    if matches!(event, Event::Key(Key::Quit)) {
        return Stage::Exit;
    }

    match (stage, event) {
        (Stage::AskOrientation, Event::Key(Key::Yes)) => Stage::AskBackground {
            height_greater_than_width: true,
        },
        (Stage::AskOrientation, Event::Key(Key::No)) => Stage::AskBackground {
            height_greater_than_width: false,
        },

        (Stage::AskBackground { height_greater_than_width }, Event::Key(key @ (Key::Yes | Key::No))) => {
            let settings = Settings {
                height_greater_than_width,
                use_background: key == Key::Yes,
            };
            if settings.use_background {
                Stage::CaptureBackground { settings }
            } else {
                Stage::CaptureReference {
                    settings,
                    background: None,
                }
            }
        }

        (Stage::CaptureBackground { settings }, Event::BackgroundCaptured(background)) => {
            Stage::ConfirmBackground { settings, background }
        }

        (Stage::ConfirmBackground { settings, background }, Event::Key(Key::Yes)) => Stage::CaptureReference {
            settings,
            background: Some(background),
        },
        (Stage::ConfirmBackground { settings, .. }, Event::Key(Key::No)) => Stage::CaptureBackground { settings },

        (Stage::CaptureReference { settings, background }, Event::ReferenceFound(reference)) => {
            Stage::ConfirmReference {
                settings,
                background,
                reference,
            }
        }

        (
            Stage::ConfirmReference {
                settings,
                background,
                reference,
            },
            Event::Key(Key::Yes),
        ) => Stage::Check {
            settings,
            background,
            reference,
        },
        (Stage::ConfirmReference { settings, background, .. }, Event::Key(Key::No)) => {
            Stage::CaptureReference { settings, background }
        }

        (Stage::Check { settings, background, .. }, Event::Key(Key::Retake)) => {
            Stage::CaptureReference { settings, background }
        }
        (Stage::Check { .. }, Event::Key(Key::No)) => Stage::AskOrientation,

        (stage, _) => stage,
    }
}

/// What a key press produced, for the operator display.
#[derive(Debug)]
pub enum Report {
    /// The stage changed or the key was ignored.
    Stage,
    /// A frame was read but it holds no connector.
    NoConnector,
    ReferenceCaptured(Inspection),
    Verdict { matched: bool, inspection: Inspection },
}

/// Workflow bound to a frame source and a base configuration.
pub struct Session<S> {
    source: S,
    config: InspectionConfig,
    stage: Stage,
}

impl<S: FrameSource> Session<S> {
    pub fn new(source: S, config: InspectionConfig) -> Self {
        Self {
            source,
            config,
            stage: Stage::AskOrientation,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Apply one key press. Enter in a capturing stage reads a frame.
    pub fn handle_key(&mut self, key: Key) -> Result<Report> {
        let (event, report) = match (&self.stage, key) {
            (Stage::CaptureBackground { .. }, Key::Enter) => {
                (Event::BackgroundCaptured(self.source.read()?), Report::Stage)
            }
            (Stage::CaptureReference { settings, background }, Key::Enter) => {
                let pipeline = self.pipeline(settings, background.as_ref())?;
                match pipeline.run(&self.source.read()?)? {
                    Some(inspection) if !inspection.colors.is_empty() => (
                        Event::ReferenceFound(inspection.colors.clone()),
                        Report::ReferenceCaptured(inspection),
                    ),
                    _ => (Event::Key(Key::Other), Report::NoConnector),
                }
            }
            (
                Stage::Check {
                    settings,
                    background,
                    reference,
                },
                Key::Enter,
            ) => {
                let pipeline = self.pipeline(settings, background.as_ref())?;
                match pipeline.check(&self.source.read()?, reference)? {
                    Some((matched, inspection)) => (Event::Key(Key::Other), Report::Verdict { matched, inspection }),
                    None => (Event::Key(Key::Other), Report::NoConnector),
                }
            }
            _ => (Event::Key(key), Report::Stage),
        };

        let stage = std::mem::replace(&mut self.stage, Stage::Exit);
        let next = transition(stage, event);
        tracing::debug!(stage = next.name(), "workflow transition");
        self.stage = next;
        Ok(report)
    }

    fn pipeline(&self, settings: &Settings, background: Option<&RgbImage>) -> Result<InspectionPipeline> {
        let mut config = self.config.clone();
        config.height_greater_than_width = settings.height_greater_than_width;
        config.threshold_strategy = if settings.use_background {
            ThresholdStrategy::BackgroundRelative
        } else {
            ThresholdStrategy::Otsu
        };

        let pipeline = InspectionPipeline::new(config);
        match background {
            Some(background) => pipeline.with_background(background),
            None => Ok(pipeline),
        }
    }
}
