//! Input commands crossing from input handling into the control layer.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// What a [`Command`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CommandType {
    /// No-op (unbound buttons).
    #[default]
    None = 0,
    Toggle = 1,
    /// Button press.
    Enable = 2,
    /// Button release.
    Disable = 3,
    /// `param1` selects the parameter, `value` carries the data.
    SetParam = 4,
}

impl CommandType {
    /// Press-like commands go to a controller's press handler.
    #[inline]
    pub fn is_press(self) -> bool {
        matches!(self, CommandType::Enable | CommandType::Toggle)
    }

    #[inline]
    pub fn is_release(self) -> bool {
        self == CommandType::Disable
    }
}

impl TryFrom<u8> for CommandType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CommandType::None),
            1 => Ok(CommandType::Toggle),
            2 => Ok(CommandType::Enable),
            3 => Ok(CommandType::Disable),
            4 => Ok(CommandType::SetParam),
            other => Err(Error::UnknownCommand(other)),
        }
    }
}

/// Command targets. `Func` is the modifier button and has no effect of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum EffectId {
    #[default]
    None = 0,
    Stutter = 1,
    Freeze = 2,
    Choke = 3,
    Func = 4,
}

impl EffectId {
    pub const COUNT: usize = 5;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectId::None => "None",
            EffectId::Stutter => "Stutter",
            EffectId::Freeze => "Freeze",
            EffectId::Choke => "Choke",
            EffectId::Func => "Func",
        }
    }
}

impl TryFrom<u8> for EffectId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(EffectId::None),
            1 => Ok(EffectId::Stutter),
            2 => Ok(EffectId::Freeze),
            3 => Ok(EffectId::Choke),
            4 => Ok(EffectId::Func),
            other => Err(Error::UnknownEffect(other)),
        }
    }
}

/// Fixed 8-byte value object. No pointers, freely copied across queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct Command {
    pub kind: CommandType,
    pub target: EffectId,
    pub param1: u8,
    pub param2: u8,
    pub value: u32,
}

const _: () = assert!(core::mem::size_of::<Command>() == 8);
const _: () = assert!(core::mem::size_of::<CommandType>() == 1);
const _: () = assert!(core::mem::size_of::<EffectId>() == 1);

impl Command {
    pub const WIRE_SIZE: usize = 8;

    pub const fn new(kind: CommandType, target: EffectId) -> Self {
        Self {
            kind,
            target,
            param1: 0,
            param2: 0,
            value: 0,
        }
    }

    pub const fn press(target: EffectId) -> Self {
        Self::new(CommandType::Enable, target)
    }

    pub const fn release(target: EffectId) -> Self {
        Self::new(CommandType::Disable, target)
    }

    pub const fn toggle(target: EffectId) -> Self {
        Self::new(CommandType::Toggle, target)
    }

    pub const fn set_param(target: EffectId, param: u8, value: u32) -> Self {
        Self {
            kind: CommandType::SetParam,
            target,
            param1: param,
            param2: 0,
            value,
        }
    }

    /// `[type, target, param1, param2, value (little endian)]`
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let v = self.value.to_le_bytes();
        [
            self.kind as u8,
            self.target as u8,
            self.param1,
            self.param2,
            v[0],
            v[1],
            v[2],
            v[3],
        ]
    }

    pub fn try_from_bytes(bytes: [u8; Self::WIRE_SIZE]) -> Result<Self> {
        Ok(Self {
            kind: CommandType::try_from(bytes[0])?,
            target: EffectId::try_from(bytes[1])?,
            param1: bytes[2],
            param2: bytes[3],
            value: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}
