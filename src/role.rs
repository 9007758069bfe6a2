//! Mob session roles.

use std::fmt;

/// Participant role driving which engine loop runs.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Role {
    /// The participant currently writing code.
    Driver,
    /// A participant observing and pulling the driver's commits.
    Navigator,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Driver => "driver",
            Role::Navigator => "navigator",
        }
    }

    /// Capitalised name for menus and notifications.
    pub fn title(&self) -> &'static str {
        match self {
            Role::Driver => "Driver",
            Role::Navigator => "Navigator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names() {
        assert_eq!(Role::Driver.name(), "driver");
        assert_eq!(Role::Navigator.name(), "navigator");
        assert_eq!(Role::Driver.title(), "Driver");
        assert_eq!(Role::Navigator.title(), "Navigator");
    }
}
