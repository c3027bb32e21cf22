/// Severity of a transient user notification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    Normal,
    Success,
    Error,
}
