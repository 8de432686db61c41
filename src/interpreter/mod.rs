mod error;
mod memory;

use crate::{ast::*, source::SourceSpan, tables::ResolutionTables, SourceReference};
pub use error::RuntimeError;
pub use memory::{MemoryError, MemoryReader, PlaceholderReader};

#[derive(Debug, Clone)]
struct Ctx {
    source_code: SourceReference,
}

/// Walks a parsed address expression. Arithmetic is carried out on `i128`,
/// and only the final result (or a dereferenced address) has to be a valid
/// `u64` address.
pub struct Interpreter<'a, R: MemoryReader + ?Sized> {
    tables: &'a ResolutionTables,
    reader: &'a R,
}

impl<'a, R: MemoryReader + ?Sized> Interpreter<'a, R> {
    pub fn new(tables: &'a ResolutionTables, reader: &'a R) -> Self {
        Self { tables, reader }
    }
    pub fn interpret(
        &self,
        expr: &Expr,
        source_code: &SourceReference,
    ) -> Result<u64, RuntimeError> {
        let ctx = Ctx {
            source_code: source_code.clone(),
        };
        let value = self.eval_expr(expr, &ctx)?;
        to_address(value, expr.source_span(), &ctx)
    }
    fn eval_expr(&self, expr: &Expr, ctx: &Ctx) -> Result<i128, RuntimeError> {
        match expr {
            Expr::HexLiteral(literal) => {
                parse_hex(&literal.text, literal.digits(), literal.source_span, ctx)
            }
            Expr::IdentPath(path) => match path.qualifier() {
                None => self.resolve_name(path.last_segment(), ctx),
                Some(module) => self.resolve_qualified(&module, path, ctx),
            },
            Expr::Unary(expr) => {
                let value = self.eval_expr(&expr.right, ctx)?;
                match *expr.operator {
                    UnaryOperator::Plus => Ok(value),
                    UnaryOperator::Minus => {
                        value.checked_neg().ok_or_else(|| RuntimeError::Overflow {
                            operator: expr.operator.to_string(),
                            operator_at: expr.operator.source_span(),
                            source_code: ctx.source_code.clone(),
                        })
                    }
                }
            }
            Expr::Binary(expr) => self.eval_binary(expr, ctx),
            Expr::Dereference(expr) => {
                let address = self.eval_expr(&expr.address, ctx)?;
                let address = to_address(address, expr.address.source_span(), ctx)?;
                self.reader
                    .read_at(address)
                    .map(i128::from)
                    .map_err(|err| RuntimeError::MemoryRead {
                        address,
                        reason: err.reason,
                        found_at: expr.source_span(),
                        source_code: ctx.source_code.clone(),
                    })
            }
        }
    }
    /// A bare name is a symbol, else a hex number, else the first export of
    /// that name in any module.
    fn resolve_name(&self, identifier: &Identifier, ctx: &Ctx) -> Result<i128, RuntimeError> {
        let name = identifier.name.as_str();
        if let Some(value) = self.tables.symbol(name) {
            return Ok(value.into());
        }
        if name.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return parse_hex(name, name, identifier.source_span, ctx);
        }
        self.tables
            .find_export(name)
            .map(i128::from)
            .ok_or_else(|| RuntimeError::UndefinedSymbol {
                name: name.to_string(),
                found_at: identifier.source_span,
                source_code: ctx.source_code.clone(),
            })
    }
    /// `module.export`, falling back to the base of a module whose file name
    /// is the whole path (`user32.dll`).
    fn resolve_qualified(
        &self,
        module: &str,
        path: &IdentPathExpr,
        ctx: &Ctx,
    ) -> Result<i128, RuntimeError> {
        let last = &path.last_segment().name;
        if let Some(address) = self
            .tables
            .exports(module)
            .and_then(|exports| exports.get(last))
        {
            return Ok((*address).into());
        }
        let file_name = format!("{}.{}", module, last);
        self.tables
            .module_base(&file_name)
            .map(i128::from)
            .ok_or_else(|| RuntimeError::NotFound {
                path: file_name,
                found_at: path.source_span(),
                source_code: ctx.source_code.clone(),
            })
    }
    fn eval_binary(&self, expr: &BinaryExpr, ctx: &Ctx) -> Result<i128, RuntimeError> {
        let left = self.eval_expr(&expr.left, ctx)?;
        let right = self.eval_expr(&expr.right, ctx)?;

        let fault = |fault: ArithmeticFault| match fault {
            ArithmeticFault::Overflow => RuntimeError::Overflow {
                operator: expr.operator.to_string(),
                operator_at: expr.operator.source_span(),
                source_code: ctx.source_code.clone(),
            },
            ArithmeticFault::DivisionByZero => RuntimeError::DivisionByZero {
                divisor_at: expr.right.source_span(),
                operator: expr.operator.to_string(),
                operator_at: expr.operator.source_span(),
                source_code: ctx.source_code.clone(),
            },
        };

        let result = match *expr.operator {
            BinaryOperator::Plus => left.checked_add(right).ok_or(ArithmeticFault::Overflow),
            BinaryOperator::Minus => left.checked_sub(right).ok_or(ArithmeticFault::Overflow),
            BinaryOperator::Multiply => left.checked_mul(right).ok_or(ArithmeticFault::Overflow),
            BinaryOperator::Divide => checked_divide(left, right),
            BinaryOperator::Power => checked_power(left, right),
        };
        result.map_err(fault)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithmeticFault {
    Overflow,
    DivisionByZero,
}

/// Integer division truncating toward zero.
fn checked_divide(left: i128, right: i128) -> Result<i128, ArithmeticFault> {
    if right == 0 {
        return Err(ArithmeticFault::DivisionByZero);
    }
    left.checked_div(right).ok_or(ArithmeticFault::Overflow)
}

/// A negative exponent is `1 / base ** -exponent` under the same truncation
/// as `/`.
fn checked_power(base: i128, exponent: i128) -> Result<i128, ArithmeticFault> {
    let odd = exponent % 2 != 0;
    match base {
        0 if exponent < 0 => Err(ArithmeticFault::DivisionByZero),
        0 if exponent == 0 => Ok(1),
        0 => Ok(0),
        1 => Ok(1),
        -1 => Ok(if odd { -1 } else { 1 }),
        _ if exponent < 0 => Ok(0),
        _ => u32::try_from(exponent)
            .ok()
            .and_then(|exponent| base.checked_pow(exponent))
            .ok_or(ArithmeticFault::Overflow),
    }
}

fn parse_hex(text: &str, digits: &str, span: SourceSpan, ctx: &Ctx) -> Result<i128, RuntimeError> {
    i128::from_str_radix(digits, 16).map_err(|_| RuntimeError::LiteralOutOfRange {
        text: text.to_string(),
        found_at: span,
        source_code: ctx.source_code.clone(),
    })
}

fn to_address(value: i128, span: SourceSpan, ctx: &Ctx) -> Result<u64, RuntimeError> {
    if value < 0 {
        return Err(RuntimeError::NegativeAddress {
            value,
            found_at: span,
            source_code: ctx.source_code.clone(),
        });
    }
    u64::try_from(value).map_err(|_| RuntimeError::AddressOutOfRange {
        value,
        found_at: span,
        source_code: ctx.source_code.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EvaluationError, Evaluator};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn run(source: &str) -> Result<u64, EvaluationError> {
        Evaluator::new(&ResolutionTables::sample()).evaluate(source)
    }

    fn runtime_error(source: &str) -> RuntimeError {
        match run(source) {
            Err(EvaluationError::Runtime(err)) => err,
            other => panic!("expected a runtime error for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn symbols_shadow_hex() {
        let tables = ResolutionTables::new().with_symbol("abc", 0x5);
        assert_eq!(Evaluator::new(&tables).evaluate("abc").unwrap(), 0x5);
        assert_eq!(run("abc").unwrap(), 0xabc);
    }

    #[test]
    fn bare_export_name() {
        assert_eq!(run("GetProcAddress").unwrap(), 0x75a1_b2c0);
        assert_eq!(run("MessageBoxW+1").unwrap(), 0x3);
    }

    #[test]
    fn export_before_module_base() {
        let tables = ResolutionTables::new()
            .with_export("mod", "dll", 0x7)
            .with_module("mod.dll", 0x1000);
        assert_eq!(Evaluator::new(&tables).evaluate("mod.dll").unwrap(), 0x7);
    }

    #[test]
    fn multi_segment_qualifier() {
        let tables = ResolutionTables::new()
            .with_export("a.b", "c", 0x11)
            .with_module("x.y.z", 0x22);
        let evaluator = Evaluator::new(&tables);
        assert_eq!(evaluator.evaluate("a.b.c").unwrap(), 0x11);
        assert_eq!(evaluator.evaluate("x.y.z").unwrap(), 0x22);
    }

    #[test]
    fn not_found() {
        match runtime_error("user32.Nope") {
            RuntimeError::NotFound { path, found_at, .. } => {
                assert_eq!(path, "user32.Nope");
                assert_eq!(found_at.start().column, 0);
                assert_eq!(found_at.end().column, 11);
            }
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn undefined_symbol_span() {
        let err = runtime_error("s1 + nothing_here");
        assert_eq!(err.to_string(), "undefined symbol 'nothing_here'");
        assert_eq!(err.span().start().column, 5);
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(run("7/2").unwrap(), 3);
        assert_eq!(run("(0-7)/2+4").unwrap(), 1);
        assert_eq!(run("(1/2)*4").unwrap(), 0);
    }

    #[test]
    fn division_by_zero_points_at_divisor() {
        match runtime_error("10/(s1 - 222)") {
            RuntimeError::DivisionByZero { divisor_at, .. } => {
                assert_eq!(divisor_at.start().column, 4);
            }
            other => panic!("expected division by zero, got {:?}", other),
        }
    }

    #[test]
    fn powers() {
        assert_eq!(checked_power(2, 10), Ok(1024));
        assert_eq!(checked_power(0, 0), Ok(1));
        assert_eq!(checked_power(2, -1), Ok(0));
        assert_eq!(checked_power(-1, -3), Ok(-1));
        assert_eq!(checked_power(1, i128::MAX), Ok(1));
        assert_eq!(checked_power(0, -2), Err(ArithmeticFault::DivisionByZero));
        assert_eq!(checked_power(2, 200), Err(ArithmeticFault::Overflow));
        assert_eq!(checked_power(2, 1 << 40), Err(ArithmeticFault::Overflow));
    }

    #[test]
    fn overflow_is_reported() {
        let err = runtime_error("ffffffffffffffff**3");
        assert!(matches!(err, RuntimeError::Overflow { .. }));
    }

    #[test]
    fn final_address_must_fit() {
        assert_eq!(run("ffffffffffffffff").unwrap(), u64::MAX);
        assert!(matches!(
            runtime_error("ffffffffffffffff+1"),
            RuntimeError::AddressOutOfRange { .. }
        ));
    }

    #[test]
    fn oversized_literal() {
        assert!(matches!(
            runtime_error("0xffffffffffffffffffffffffffffffffff"),
            RuntimeError::LiteralOutOfRange { .. }
        ));
    }

    #[test]
    fn dereference_uses_reader() {
        let reads = RefCell::new(Vec::new());
        let reader = |address: u64| -> Result<u64, MemoryError> {
            reads.borrow_mut().push(address);
            Ok(address * 2)
        };
        let tables = ResolutionTables::sample();
        let evaluator = Evaluator::with_reader(&tables, reader);
        assert_eq!(evaluator.evaluate("[[game.exe+10]]+1").unwrap(), 0x0100_0041);
        assert_eq!(*reads.borrow(), vec![0x0040_0010, 0x0080_0020]);
    }

    #[test]
    fn failed_read() {
        let reader = |_: u64| -> Result<u64, MemoryError> { Err(MemoryError::new("page not mapped")) };
        let tables = ResolutionTables::sample();
        match Evaluator::with_reader(&tables, reader).evaluate("[100]") {
            Err(EvaluationError::Runtime(err @ RuntimeError::MemoryRead { .. })) => {
                assert_eq!(
                    err.to_string(),
                    "failed to read memory at 0x100: page not mapped"
                );
            }
            other => panic!("expected memory read error, got {:?}", other),
        }
    }

    #[test]
    fn negative_dereference() {
        match runtime_error("[0-1]") {
            RuntimeError::NegativeAddress { value, found_at, .. } => {
                assert_eq!(value, -1);
                assert_eq!(found_at.start().column, 1);
            }
            other => panic!("expected negative address, got {:?}", other),
        }
    }
}
