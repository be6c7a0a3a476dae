//! The fixed tool registry and the built-in payment functions.
//!
//! The registry is assembled once at startup and never mutated afterwards,
//! so it can be shared across requests without locking. Lookups against
//! unknown names are a checked error path, not a panic.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;

/// A locally executable function the model can request. Implementations may
/// be asynchronous; the built-ins happen to be synchronous and fast.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value) -> ToolResult<String>;
}

struct RegisteredTool {
    spec: Tool,
    handler: Arc<dyn ToolHandler>,
}

/// Static mapping from function name to handler. Immutable after
/// construction.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry advertised by the routes: the two payment functions.
    pub fn with_payment_tools() -> Self {
        let mut registry = Self::new();
        registry.register(
            Tool::new(
                "getPaymentStatus",
                "Get the payment status of a transaction",
                transaction_schema(),
            ),
            Arc::new(PaymentStatusTool),
        );
        registry.register(
            Tool::new(
                "getPaymentDate",
                "Get the payment date of a transaction",
                transaction_schema(),
            ),
            Arc::new(PaymentDateTool),
        );
        registry
    }

    pub fn register(&mut self, spec: Tool, handler: Arc<dyn ToolHandler>) {
        self.tools
            .insert(spec.name.clone(), RegisteredTool { spec, handler });
    }

    /// Tool specs to advertise on a completion call
    pub fn specs(&self) -> Vec<Tool> {
        let mut specs: Vec<Tool> = self.tools.values().map(|t| t.spec.clone()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Look up and invoke a function by name. Unknown names are a
    /// `ToolError::NotFound`, never a fallback.
    pub async fn invoke(&self, name: &str, args: Value) -> ToolResult<String> {
        let registered = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        registered.handler.call(args).await
    }
}

fn transaction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "transactionId": {
                "type": "string",
                "description": "The transaction id, e.g. T1001"
            }
        },
        "required": ["transactionId"]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionArgs {
    transaction_id: String,
}

struct PaymentRecord {
    transaction_id: &'static str,
    payment_date: &'static str,
    payment_status: &'static str,
}

// The demo ledger the payment tools answer from.
const PAYMENT_LEDGER: &[PaymentRecord] = &[
    PaymentRecord {
        transaction_id: "T1001",
        payment_date: "2021-10-05",
        payment_status: "Paid",
    },
    PaymentRecord {
        transaction_id: "T1002",
        payment_date: "2021-10-06",
        payment_status: "Unpaid",
    },
    PaymentRecord {
        transaction_id: "T1003",
        payment_date: "2021-10-07",
        payment_status: "Paid",
    },
    PaymentRecord {
        transaction_id: "T1004",
        payment_date: "2021-10-05",
        payment_status: "Paid",
    },
    PaymentRecord {
        transaction_id: "T1005",
        payment_date: "2021-10-08",
        payment_status: "Pending",
    },
];

fn find_transaction(args: Value) -> ToolResult<&'static PaymentRecord> {
    let args: TransactionArgs = serde_json::from_value(args)
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

    PAYMENT_LEDGER
        .iter()
        .find(|record| record.transaction_id == args.transaction_id)
        .ok_or_else(|| {
            ToolError::ExecutionFailed(format!("transaction {} not found", args.transaction_id))
        })
}

struct PaymentStatusTool;

#[async_trait]
impl ToolHandler for PaymentStatusTool {
    async fn call(&self, args: Value) -> ToolResult<String> {
        let record = find_transaction(args)?;
        Ok(json!({ "status": record.payment_status }).to_string())
    }
}

struct PaymentDateTool;

#[async_trait]
impl ToolHandler for PaymentDateTool {
    async fn call(&self, args: Value) -> ToolResult<String> {
        let record = find_transaction(args)?;
        Ok(json!({ "date": record.payment_date }).to_string())
    }
}
