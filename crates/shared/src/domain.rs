use std::fmt;

/// Discrete user input forwarded from the front-end to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
    /// Center button or rotary push.
    ActionPress,
    AuxButtonLeft,
    AuxButtonRight,
    /// Sent exactly once by the front-end when it shuts down.
    ExitProgram,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Left,
        Action::Right,
        Action::ActionPress,
        Action::AuxButtonLeft,
        Action::AuxButtonRight,
        Action::ExitProgram,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Left => "left",
            Action::Right => "right",
            Action::ActionPress => "action_press",
            Action::AuxButtonLeft => "aux_button_left",
            Action::AuxButtonRight => "aux_button_right",
            Action::ExitProgram => "exit_program",
        }
    }

    pub fn is_exit(self) -> bool {
        self == Action::ExitProgram
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
