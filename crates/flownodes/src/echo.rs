use async_trait::async_trait;
use flowcore::{ExecutionContext, NodeError, Operation, PortMap, Vars};

/// Passes `input` through to `output` unchanged
pub struct EchoOperation;

#[async_trait]
impl Operation for EchoOperation {
    async fn execute(&self, ctx: &ExecutionContext, inputs: &PortMap, _vars: &mut Vars) -> Result<PortMap, NodeError> {
        let input = ctx.require(inputs, "input")?;
        ctx.log(format!("Echo: {input}"));
        Ok(PortMap::from([("output".to_string(), input.clone())]))
    }
}
