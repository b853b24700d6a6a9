//! Mutable traversal over statement trees.
//!
//! Implementors override the hooks they care about and call the free
//! function of the same name to keep walking.
#![allow(unused_variables)]

use super::*;

pub trait VisitMut {
    fn visit_expr_mut(&mut self, i: &mut Expr) {
        visit_expr_mut(self, i);
    }

    fn visit_path_mut(&mut self, i: &mut Path) {
        visit_path_mut(self, i);
    }

    fn visit_select_mut(&mut self, i: &mut Select) {
        visit_select_mut(self, i);
    }

    fn visit_column_mut(&mut self, i: &mut Column) {
        visit_column_mut(self, i);
    }

    fn visit_source_mut(&mut self, i: &mut Source) {
        visit_source_mut(self, i);
    }

    fn visit_limit_mut(&mut self, i: &mut Limit) {
        visit_limit_mut(self, i);
    }

    fn visit_value_mut(&mut self, i: &mut Value) {}
}

pub fn visit_expr_mut<V: VisitMut + ?Sized>(v: &mut V, node: &mut Expr) {
    match node {
        Expr::Ref(path) => v.visit_path_mut(path),
        Expr::Value(value) => v.visit_value_mut(value),
        Expr::Arg(_) | Expr::Raw(_) => {}
        Expr::Func(func) => {
            for arg in &mut func.args {
                v.visit_expr_mut(arg);
            }
        }
        Expr::List(items) | Expr::And(items) | Expr::Or(items) => {
            for item in items {
                v.visit_expr_mut(item);
            }
        }
        Expr::Stmt(select) => v.visit_select_mut(select),
        Expr::BinaryOp(expr) => {
            v.visit_expr_mut(&mut expr.lhs);
            v.visit_expr_mut(&mut expr.rhs);
        }
        Expr::Not(expr) => v.visit_expr_mut(expr),
        Expr::IsNull(expr) => v.visit_expr_mut(&mut expr.expr),
        Expr::InList(expr) => {
            v.visit_expr_mut(&mut expr.expr);
            v.visit_expr_mut(&mut expr.list);
        }
        Expr::Like(expr) => {
            v.visit_expr_mut(&mut expr.expr);
            v.visit_expr_mut(&mut expr.pattern);
        }
        Expr::Exists(expr) => match &mut expr.target {
            ExistsTarget::Path(path) => v.visit_path_mut(path),
            ExistsTarget::Select(select) => v.visit_select_mut(select),
        },
        Expr::Quantified(expr) => {
            v.visit_path_mut(&mut expr.path);
            v.visit_expr_mut(&mut expr.predicate);
        }
    }
}

pub fn visit_path_mut<V: VisitMut + ?Sized>(v: &mut V, node: &mut Path) {
    for segment in &mut node.segments {
        if let Some(filter) = &mut segment.filter {
            v.visit_expr_mut(filter);
        }
    }
}

pub fn visit_select_mut<V: VisitMut + ?Sized>(v: &mut V, node: &mut Select) {
    v.visit_source_mut(&mut node.from);

    for column in &mut node.columns {
        v.visit_column_mut(column);
    }

    if let Some(filter) = &mut node.filter {
        v.visit_expr_mut(filter);
    }

    for expr in &mut node.group_by {
        v.visit_expr_mut(expr);
    }

    if let Some(having) = &mut node.having {
        v.visit_expr_mut(having);
    }

    for order_by in &mut node.order_by {
        v.visit_expr_mut(&mut order_by.expr);
    }

    if let Some(limit) = &mut node.limit {
        v.visit_limit_mut(limit);
    }
}

pub fn visit_column_mut<V: VisitMut + ?Sized>(v: &mut V, node: &mut Column) {
    match node {
        Column::Expr { expr, .. } => v.visit_expr_mut(expr),
        Column::Expand(expand) => {
            v.visit_path_mut(&mut expand.path);
            for column in &mut expand.columns {
                v.visit_column_mut(column);
            }
            for order_by in &mut expand.order_by {
                v.visit_expr_mut(&mut order_by.expr);
            }
            if let Some(limit) = &mut expand.limit {
                v.visit_limit_mut(limit);
            }
        }
        Column::Inline(inline) => {
            v.visit_path_mut(&mut inline.path);
            for column in &mut inline.columns {
                v.visit_column_mut(column);
            }
        }
        Column::Wildcard { .. } => {}
    }
}

pub fn visit_source_mut<V: VisitMut + ?Sized>(v: &mut V, node: &mut Source) {
    match node {
        Source::Entity { .. } => {}
        Source::Join(join) => {
            v.visit_source_mut(&mut join.left);
            v.visit_source_mut(&mut join.right);
            v.visit_expr_mut(&mut join.on);
        }
        Source::Select { select, .. } => v.visit_select_mut(select),
    }
}

pub fn visit_limit_mut<V: VisitMut + ?Sized>(v: &mut V, node: &mut Limit) {
    if let Some(rows) = &mut node.rows {
        v.visit_expr_mut(rows);
    }
    if let Some(offset) = &mut node.offset {
        v.visit_expr_mut(offset);
    }
}

/// Calls `f` on every expression in the tree, children before parents.
pub fn for_each_expr_mut<F>(node: &mut Select, f: F)
where
    F: FnMut(&mut Expr),
{
    struct ForEach<F> {
        f: F,
    }

    impl<F: FnMut(&mut Expr)> VisitMut for ForEach<F> {
        fn visit_expr_mut(&mut self, node: &mut Expr) {
            visit_expr_mut(self, node);
            (self.f)(node);
        }
    }

    ForEach { f }.visit_select_mut(node);
}
