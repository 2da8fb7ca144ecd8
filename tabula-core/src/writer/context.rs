/// State carried while writing one statement.
///
/// `counter` numbers the placeholders, it is shared by every clause of the statement so
/// parameters bound in `SET` and `WHERE` never collide.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub counter: u32,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }
}
