//! Engine state machine codes and host requests.

/// Top-level engine state.
///
/// Numeric codes are what scripts pass to `SetEngineState`. `Paused` is
/// internal and has no code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum EngineState {
    DevMenu,
    #[default]
    MainGame,
    InitDevMenu,
    /// Simulation frozen for a countdown, then back to `MainGame`.
    Wait,
    /// A script faulted; the simulation is frozen until the host intervenes.
    ScriptError,
    InitPause,
    ExitPause,
    /// Terminal.
    EndGame,
    /// Restart from the first stage on the next tick.
    ResetGame,
    StartMenu,
    /// Only pause-exempt entities update.
    Paused,
}

impl EngineState {
    pub const fn code(self) -> Option<i32> {
        Some(match self {
            EngineState::DevMenu => 0,
            EngineState::MainGame => 1,
            EngineState::InitDevMenu => 2,
            EngineState::Wait => 3,
            EngineState::ScriptError => 4,
            EngineState::InitPause => 5,
            EngineState::ExitPause => 6,
            EngineState::EndGame => 7,
            EngineState::ResetGame => 8,
            EngineState::StartMenu => 0x80,
            EngineState::Paused => return None,
        })
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => EngineState::DevMenu,
            1 => EngineState::MainGame,
            2 => EngineState::InitDevMenu,
            3 => EngineState::Wait,
            4 => EngineState::ScriptError,
            5 => EngineState::InitPause,
            6 => EngineState::ExitPause,
            7 => EngineState::EndGame,
            8 => EngineState::ResetGame,
            0x80 => EngineState::StartMenu,
            _ => return None,
        })
    }

    /// States in which entities are updated at all.
    pub const fn runs_simulation(self) -> bool {
        matches!(self, EngineState::MainGame | EngineState::Paused)
    }

    /// Menu-like states that still render.
    pub const fn is_menu(self) -> bool {
        matches!(
            self,
            EngineState::DevMenu | EngineState::InitDevMenu | EngineState::StartMenu
        )
    }
}

/// Requests a host may issue between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostRequest {
    Pause,
    /// Leaves pause, menus and the script-error state.
    Resume,
    /// Restart from the first stage.
    Reset,
    Quit,
    LoadStage(usize),
}
