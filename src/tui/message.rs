//! Message enum for Elm Architecture (TEA) pattern.
//!
//! All possible user actions in the application are represented as messages,
//! dispatched from key events and processed by `App::update()`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    // App lifecycle
    /// Quit the application
    Quit,
    /// Refresh the demo issue list now
    Refresh,
    /// Remove the stored token and return to the credential screen
    Logout,

    // Navigation
    /// Move selection up by one
    MoveUp,
    /// Move selection down by one
    MoveDown,
    /// Go to the first item
    GotoTop,
    /// Go to the last item
    GotoBottom,
    /// Switch focus between the templates and demos panels
    SwitchPanel,

    // Selection actions
    /// Open the selected template's new-issue page, or the selected demo's
    /// repository (falling back to the issue itself)
    OpenSelected,
    /// Close the selected demo issue
    CloseSelected,
    /// Add or remove the lifecycle hold on the selected demo issue
    ToggleHoldSelected,

    // UI toggles
    /// Switch between light and dark theme
    ToggleTheme,
    /// Toggle help popup
    ToggleHelp,
    /// Close current popup
    CloseModal,

    // Credential entry
    /// Add a character to the token input
    TokenInput(char),
    /// Remove the last character from the token input
    TokenBackspace,
    /// Persist the entered token and authenticate
    TokenSubmit,

    /// No operation (unhandled key)
    None,
}
