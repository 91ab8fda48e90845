/// Role a process ends up in after looking at its arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchState {
    #[default]
    Start,
    /// Long-lived GTK instance owning the bus name.
    PrimaryRunning,
    /// One remote call was issued to the primary instance.
    CommandForwarded,
    /// Argument validation failed; nothing was sent.
    Rejected,
}

impl DispatchState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Start)
    }
}
