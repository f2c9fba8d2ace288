#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    SqlWith,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectWhere,
    SqlSelectOrderBy,
    SqlJoin,
    SqlUpdate,
    SqlUpdateSet,
    SqlDeleteFrom,
    SqlInsertInto,
    SqlInsertIntoOutput,
    SqlInsertIntoValues,
    SqlMerge,
    SqlMergeUsing,
    SqlDeclare,
    SqlCreateType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Next positional parameter index.
    pub counter: u32,
    pub fragment: Fragment,
    pub qualify_columns: bool,
}

impl Context {
    pub fn new(fragment: Fragment, qualify_columns: bool) -> Self {
        Self {
            counter: 0,
            fragment,
            qualify_columns,
        }
    }

    pub fn switch_fragment<'s>(&'s mut self, fragment: Fragment) -> ContextUpdater<'s> {
        ContextUpdater {
            current: Context { fragment, ..*self },
            previous: self,
        }
    }

    /// Takes the next parameter index.
    pub fn reserve_parameter(&mut self) -> u32 {
        let index = self.counter;
        self.counter += 1;
        index
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Fragment::None, false)
    }
}

/// Scoped fragment change, the parameter counter flows back to the parent context on drop.
pub struct ContextUpdater<'a> {
    pub current: Context,
    pub previous: &'a mut Context,
}

impl<'a> Drop for ContextUpdater<'a> {
    fn drop(&mut self) {
        self.previous.counter = self.current.counter;
    }
}
