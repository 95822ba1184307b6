//! Typed instructions decoded from blocks.
//!
//! A block is classified by its kind first, then by the leading words of its
//! label, and its operands are pulled through the marker table in
//! [`super::operand`]. The runner only ever sees `Instruction`s.

use super::graph::BlockKind;
use super::operand::{self, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Hat,
    Move,
    TurnRight,
    TurnLeft,
    PointInDirection,
    GoTo,
    ChangeX,
    ChangeY,
    SetX,
    SetY,
    Bounce,
    Say,
    SayFor,
    Think,
    ThinkFor,
    Show,
    Hide,
    ChangeSize,
    SetSize,
    NextCostume,
    SwitchCostume,
    PlaySound,
    StopAllSounds,
    SetVolume,
    ChangeVolume,
    Wait,
    Repeat,
    Forever,
    Stop,
    PickRandom,
    SetVariable,
    ChangeVariable,
    ShowVariable,
    HideVariable,
    NoOp,
}

impl Opcode {
    pub fn classify(kind: BlockKind, label: &str) -> Opcode {
        let l = label.trim().to_ascii_lowercase();
        let l = l.as_str();
        match kind {
            BlockKind::Event => Opcode::Hat,
            BlockKind::Motion => {
                if l.starts_with("move") {
                    Opcode::Move
                } else if l.starts_with("turn right") {
                    Opcode::TurnRight
                } else if l.starts_with("turn left") {
                    Opcode::TurnLeft
                } else if l.starts_with("point in direction") {
                    Opcode::PointInDirection
                } else if l.starts_with("go to") {
                    Opcode::GoTo
                } else if l.starts_with("change x") {
                    Opcode::ChangeX
                } else if l.starts_with("change y") {
                    Opcode::ChangeY
                } else if l.starts_with("set x") {
                    Opcode::SetX
                } else if l.starts_with("set y") {
                    Opcode::SetY
                } else if l.contains("bounce") {
                    Opcode::Bounce
                } else {
                    Opcode::NoOp
                }
            }
            BlockKind::Looks => {
                if l.starts_with("say") {
                    if operand::has_number_after(l, " for ") {
                        Opcode::SayFor
                    } else {
                        Opcode::Say
                    }
                } else if l.starts_with("think") {
                    if operand::has_number_after(l, " for ") {
                        Opcode::ThinkFor
                    } else {
                        Opcode::Think
                    }
                } else if l == "show" {
                    Opcode::Show
                } else if l == "hide" {
                    Opcode::Hide
                } else if l.starts_with("change size") {
                    Opcode::ChangeSize
                } else if l.starts_with("set size") {
                    Opcode::SetSize
                } else if l.starts_with("next costume") {
                    Opcode::NextCostume
                } else if l.starts_with("switch costume") {
                    Opcode::SwitchCostume
                } else {
                    Opcode::NoOp
                }
            }
            BlockKind::Sound => {
                if l.starts_with("play sound") || l.starts_with("start sound") {
                    Opcode::PlaySound
                } else if l.starts_with("stop all sounds") {
                    Opcode::StopAllSounds
                } else if l.starts_with("set volume") {
                    Opcode::SetVolume
                } else if l.starts_with("change volume") {
                    Opcode::ChangeVolume
                } else {
                    Opcode::NoOp
                }
            }
            BlockKind::Control => {
                if l.starts_with("wait until") || l.starts_with("repeat until") {
                    Opcode::NoOp
                } else if l.starts_with("wait") {
                    Opcode::Wait
                } else if l.starts_with("repeat") {
                    Opcode::Repeat
                } else if l.starts_with("forever") {
                    Opcode::Forever
                } else if l.starts_with("stop") {
                    Opcode::Stop
                } else {
                    Opcode::NoOp
                }
            }
            BlockKind::Operators => {
                if l.starts_with("pick random") {
                    Opcode::PickRandom
                } else {
                    Opcode::NoOp
                }
            }
            BlockKind::Variables => {
                if l.starts_with("show variable") {
                    Opcode::ShowVariable
                } else if l.starts_with("hide variable") {
                    Opcode::HideVariable
                } else if l.starts_with("set ") && l.contains(" to ") {
                    Opcode::SetVariable
                } else if l.starts_with("change ") && l.contains(" by ") {
                    Opcode::ChangeVariable
                } else {
                    Opcode::NoOp
                }
            }
            BlockKind::Sensing | BlockKind::CustomBlock => Opcode::NoOp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Hat,
    Move(Operand),
    Turn(Operand, Rotation),
    PointInDirection(Operand),
    GoTo { x: Operand, y: Operand },
    ChangeX(Operand),
    ChangeY(Operand),
    SetX(Operand),
    SetY(Operand),
    Bounce,
    Say { text: String, think: bool, secs: Option<Operand> },
    Show,
    Hide,
    ChangeSize(Operand),
    SetSize(Operand),
    NextCostume,
    SwitchCostume(Operand),
    PlaySound(String),
    StopAllSounds,
    SetVolume(Operand),
    ChangeVolume(Operand),
    Wait(Operand),
    Repeat(Operand),
    Forever,
    Stop,
    PickRandom { from: Operand, to: Operand },
    SetVariable { name: String, value: Operand },
    ChangeVariable { name: String, by: Operand },
    ShowVariable(String, bool),
    /// Recognised kind, unsupported label. Dispatched without effect.
    NoOp(BlockKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Instruction {
    pub fn decode(kind: BlockKind, label: &str) -> Instruction {
        let op = Opcode::classify(kind, label);
        let num = |slot| operand::number(label, op, slot);
        let text = |slot| operand::text_operand(label, op, slot);
        match op {
            Opcode::Hat => Instruction::Hat,
            Opcode::Move => Instruction::Move(num(0)),
            Opcode::TurnRight => Instruction::Turn(num(0), Rotation::Clockwise),
            Opcode::TurnLeft => Instruction::Turn(num(0), Rotation::CounterClockwise),
            Opcode::PointInDirection => Instruction::PointInDirection(num(0)),
            Opcode::GoTo => Instruction::GoTo { x: num(0), y: num(1) },
            Opcode::ChangeX => Instruction::ChangeX(num(0)),
            Opcode::ChangeY => Instruction::ChangeY(num(0)),
            Opcode::SetX => Instruction::SetX(num(0)),
            Opcode::SetY => Instruction::SetY(num(0)),
            Opcode::Bounce => Instruction::Bounce,
            Opcode::Say => Instruction::Say { text: text(0), think: false, secs: None },
            Opcode::Think => Instruction::Say { text: text(0), think: true, secs: None },
            Opcode::SayFor => Instruction::Say { text: text(0), think: false, secs: Some(num(1)) },
            Opcode::ThinkFor => Instruction::Say { text: text(0), think: true, secs: Some(num(1)) },
            Opcode::Show => Instruction::Show,
            Opcode::Hide => Instruction::Hide,
            Opcode::ChangeSize => Instruction::ChangeSize(num(0)),
            Opcode::SetSize => Instruction::SetSize(num(0)),
            Opcode::NextCostume => Instruction::NextCostume,
            Opcode::SwitchCostume => Instruction::SwitchCostume(num(0)),
            Opcode::PlaySound => Instruction::PlaySound(text(0)),
            Opcode::StopAllSounds => Instruction::StopAllSounds,
            Opcode::SetVolume => Instruction::SetVolume(num(0)),
            Opcode::ChangeVolume => Instruction::ChangeVolume(num(0)),
            Opcode::Wait => Instruction::Wait(num(0)),
            Opcode::Repeat => Instruction::Repeat(num(0)),
            Opcode::Forever => Instruction::Forever,
            Opcode::Stop => Instruction::Stop,
            Opcode::PickRandom => Instruction::PickRandom { from: num(0), to: num(1) },
            Opcode::SetVariable => Instruction::SetVariable { name: text(0), value: num(1) },
            Opcode::ChangeVariable => Instruction::ChangeVariable { name: text(0), by: num(1) },
            Opcode::ShowVariable => Instruction::ShowVariable(text(0), true),
            Opcode::HideVariable => Instruction::ShowVariable(text(0), false),
            Opcode::NoOp => Instruction::NoOp(kind),
        }
    }
}
