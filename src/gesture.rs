//! Touch gesture state machine.
//!
//! A single active gesture is tracked at a time: one finger paints or pans
//! (depending on the brush mode), two or more fingers pinch-zoom and pan
//! together. Transitions are pure; their effects come back as commands for the
//! session to apply.

use crate::brush::BrushMode;
use crate::transform::ViewTransform;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
}

/// A touch event with every touch still down afterwards, in device space.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub touches: Vec<Point>,
}

impl TouchEvent {
    pub fn start(touches: &[Point]) -> Self {
        Self {
            phase: TouchPhase::Start,
            touches: touches.to_vec(),
        }
    }

    pub fn moved(touches: &[Point]) -> Self {
        Self {
            phase: TouchPhase::Move,
            touches: touches.to_vec(),
        }
    }

    pub fn end(touches: &[Point]) -> Self {
        Self {
            phase: TouchPhase::End,
            touches: touches.to_vec(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// `last` is in image space.
    Drawing { last: Point },
    /// `last` is in device space.
    Panning { last: Point },
    Scaling { distance: f32, center: Point },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureCommand {
    /// Snapshot the mask, then stamp at `at` (image space).
    BeginStroke { at: Point },
    StrokeTo { from: Point, to: Point },
    PanBy { dx: f32, dy: f32 },
    ZoomAround { factor: f32, pivot: Point },
}

pub fn transition(
    state: GestureState,
    event: &TouchEvent,
    mode: BrushMode,
    view: &ViewTransform,
) -> (GestureState, Vec<GestureCommand>) {
    let touches = &event.touches;
    match event.phase {
        TouchPhase::Start => match touches.len() {
            0 => (state, Vec::new()),
            1 => {
                let p = touches[0];
                if mode.paint_value().is_none() {
                    (GestureState::Panning { last: p }, Vec::new())
                } else {
                    let (ix, iy) = view.to_image_space(p.x, p.y);
                    let at = Point::new(ix, iy);
                    (
                        GestureState::Drawing { last: at },
                        vec![GestureCommand::BeginStroke { at }],
                    )
                }
            }
            _ => (
                GestureState::Scaling {
                    distance: touches[0].distance(touches[1]),
                    center: touches[0].midpoint(touches[1]),
                },
                Vec::new(),
            ),
        },

        TouchPhase::Move => match state {
            GestureState::Drawing { last } if touches.len() == 1 => {
                let (ix, iy) = view.to_image_space(touches[0].x, touches[0].y);
                let to = Point::new(ix, iy);
                (
                    GestureState::Drawing { last: to },
                    vec![GestureCommand::StrokeTo { from: last, to }],
                )
            }
            GestureState::Panning { last } if touches.len() == 1 => {
                let p = touches[0];
                (
                    GestureState::Panning { last: p },
                    vec![GestureCommand::PanBy {
                        dx: p.x - last.x,
                        dy: p.y - last.y,
                    }],
                )
            }
            GestureState::Scaling { distance, center } if touches.len() >= 2 => {
                let new_distance = touches[0].distance(touches[1]);
                let new_center = touches[0].midpoint(touches[1]);
                let mut commands = Vec::with_capacity(2);
                if distance > 0.0 {
                    commands.push(GestureCommand::ZoomAround {
                        factor: new_distance / distance,
                        pivot: new_center,
                    });
                }
                commands.push(GestureCommand::PanBy {
                    dx: new_center.x - center.x,
                    dy: new_center.y - center.y,
                });
                let next = GestureState::Scaling {
                    distance: new_distance,
                    center: new_center,
                };
                (next, commands)
            }
            _ => (state, Vec::new()),
        },

        TouchPhase::End => {
            let next = match state {
                GestureState::Scaling { .. } if touches.len() < 2 => GestureState::Idle,
                GestureState::Drawing { .. } | GestureState::Panning { .. }
                    if touches.is_empty() =>
                {
                    GestureState::Idle
                }
                other => other,
            };
            (next, Vec::new())
        }
    }
}

#[derive(Debug, Default)]
pub struct GestureController {
    state: GestureState,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    pub fn handle(
        &mut self,
        event: &TouchEvent,
        mode: BrushMode,
        view: &ViewTransform,
    ) -> Vec<GestureCommand> {
        let (next, commands) = transition(self.state, event, mode, view);
        if std::mem::discriminant(&next) != std::mem::discriminant(&self.state) {
            log::debug!("gesture {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        commands
    }

    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}
