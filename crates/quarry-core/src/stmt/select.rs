use super::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub from: Source,

    /// Requested columns. An empty list selects all columns.
    pub columns: Vec<Column>,

    pub filter: Option<Expr>,

    pub group_by: Vec<Expr>,

    pub having: Option<Expr>,

    pub order_by: Vec<OrderBy>,

    pub limit: Option<Limit>,

    pub distinct: bool,

    /// Search terms matched against the searchable elements of the source
    pub search: Vec<String>,

    pub lock: Option<Lock>,
}

impl Select {
    pub fn from(source: impl Into<Source>) -> Select {
        Select {
            from: source.into(),
            columns: vec![],
            filter: None,
            group_by: vec![],
            having: None,
            order_by: vec![],
            limit: None,
            distinct: false,
            search: vec![],
            lock: None,
        }
    }

    pub fn columns<I>(mut self, columns: I) -> Select
    where
        I: IntoIterator,
        I::Item: Into<Column>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn column(mut self, column: impl Into<Column>) -> Select {
        self.columns.push(column.into());
        self
    }

    /// Adds a filter, AND-ed with any existing one.
    pub fn filter(mut self, expr: impl Into<Expr>) -> Select {
        self.filter = Some(match self.filter.take() {
            Some(existing) => Expr::and(existing, expr),
            None => expr.into(),
        });
        self
    }

    pub fn group_by(mut self, expr: impl Into<Expr>) -> Select {
        self.group_by.push(expr.into());
        self
    }

    pub fn having(mut self, expr: impl Into<Expr>) -> Select {
        self.having = Some(expr.into());
        self
    }

    pub fn order_by(mut self, order_by: impl Into<OrderBy>) -> Select {
        self.order_by.push(order_by.into());
        self
    }

    pub fn limit(mut self, rows: u64) -> Select {
        self.limit.get_or_insert_with(Limit::default).rows = Some(Expr::from(rows as i64));
        self
    }

    pub fn offset(mut self, offset: u64) -> Select {
        self.limit.get_or_insert_with(Limit::default).offset = Some(Expr::from(offset as i64));
        self
    }

    pub fn distinct(mut self) -> Select {
        self.distinct = true;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Select {
        self.search.push(term.into());
        self
    }

    pub fn for_update(mut self, wait: LockWait) -> Select {
        self.lock = Some(Lock::new(LockMode::Update, wait));
        self
    }

    pub fn for_share(mut self, wait: LockWait) -> Select {
        self.lock = Some(Lock::new(LockMode::Share, wait));
        self
    }

    pub fn lock(mut self, lock: Lock) -> Select {
        self.lock = Some(lock);
        self
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Statement::Select(value)
    }
}
