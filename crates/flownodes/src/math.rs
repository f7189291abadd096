use async_trait::async_trait;
use flowcore::{ExecutionContext, NodeError, Operation, Payload, PortMap, Vars};

/// `a + b` over decimal integers, output on `sum`.
pub struct AddOperation;

#[async_trait]
impl Operation for AddOperation {
    async fn execute(&self, ctx: &ExecutionContext, inputs: &PortMap, _vars: &mut Vars) -> Result<PortMap, NodeError> {
        let a = integer(ctx, inputs, "a")?;
        let b = integer(ctx, inputs, "b")?;
        let sum = a
            .checked_add(b)
            .ok_or_else(|| NodeError::ExecutionFailed(format!("{a} + {b} overflows")))?;
        Ok(PortMap::from([("sum".to_string(), Payload::from(sum))]))
    }
}

/// `a * b` over decimal integers, output on `product`.
pub struct MulOperation;

#[async_trait]
impl Operation for MulOperation {
    async fn execute(&self, ctx: &ExecutionContext, inputs: &PortMap, _vars: &mut Vars) -> Result<PortMap, NodeError> {
        let a = integer(ctx, inputs, "a")?;
        let b = integer(ctx, inputs, "b")?;
        let product = a
            .checked_mul(b)
            .ok_or_else(|| NodeError::ExecutionFailed(format!("{a} * {b} overflows")))?;
        Ok(PortMap::from([("product".to_string(), Payload::from(product))]))
    }
}

fn integer(ctx: &ExecutionContext, inputs: &PortMap, name: &str) -> Result<i64, NodeError> {
    let raw = ctx.require(inputs, name)?;
    raw.as_i64().ok_or_else(|| NodeError::InvalidInput {
        field: name.to_string(),
        reason: format!("expected a decimal integer, got {raw:?}"),
    })
}
