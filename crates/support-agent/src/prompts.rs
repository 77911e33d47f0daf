//! System instruction for the hosted model.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever preamble content changes
//! so transcripts can be traced back to the instruction that produced them.

use disclosure::{Decision, OrderContext};

/// Prompt version. Bump on any preamble content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Fixed rules handed to the model ahead of the order context.
pub const SUPPORT_PREAMBLE: &str = "\
You are a retail Support Assistant helping a customer with exactly one order.

## Strict rules
1. If the order is not delivered, the invoice is not final. Never provide a PDF, \
a download link, or a delivery date.
2. NEVER use placeholders such as [Current Date] or [Order ID]. Use ONLY the order \
data given below; if a value is not listed, do not mention it.
3. Minimalist first: when asked for an invoice or bill before delivery, explain the \
delivery policy and ask whether the customer needs the tax details for a claim. Do \
not list the amounts yet.
4. Share the amounts only when the customer needs them for an office claim or \
reimbursement, and copy them exactly as listed.
5. \"GT Charges\" means Goods Transport Charges.
6. Politely decline technician or installation requests for items that need no \
installation. Never say a request is approved.
7. Offer a WhatsApp reminder only when the decision below tells you to.";

/// Build the full system instruction for one reply.
///
/// The policy has already decided what to do; the model only phrases it.
/// `reference_reply` is the templated text the model must stay consistent with.
pub fn system_instruction(
    order: &OrderContext,
    decision: &Decision,
    reference_reply: &str,
) -> String {
    let customer = order
        .customer_name()
        .map(|name| format!("Customer: {}\n", name))
        .unwrap_or_default();

    format!(
        "{preamble}\n\n## Order\n{customer}{context}\n\n## Decision for this reply\n\
         Action: {action}\nReason: {rationale}\n\n## Reference reply\n{reference}\n\n\
         Reply in the same language as the customer, convey the same content as the \
         reference reply, and add nothing the rules forbid.",
        preamble = SUPPORT_PREAMBLE,
        customer = customer,
        context = order.context_lines().join("\n"),
        action = decision.action.kind(),
        rationale = decision.rationale,
        reference = reference_reply,
    )
}
