use crate::infrastructure::config::types::LoadConfig;

impl LoadConfig {
    /// Collects every problem instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.nodes.is_empty() {
            errors.push("nodes must not be empty".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            for (field, value) in [
                ("ip", &node.ip),
                ("port", &node.port),
                ("id", &node.id),
                ("address_base", &node.address_base),
                ("key_identifier", &node.key_identifier),
            ] {
                if value.trim().is_empty() {
                    errors.push(format!("nodes[{index}].{field} must not be empty"));
                }
            }
        }

        if self.transactions_per_node == 0 {
            errors.push("transactions_per_node must be > 0".to_string());
        }
        if self.outputs_per_transaction == 0 {
            errors.push("outputs_per_transaction must be > 0".to_string());
        }
        if self.worker_count == 0 {
            errors.push("worker_count must be > 0".to_string());
        }
        if self.receiver_address_base.trim().is_empty() || self.receiver_key_identifier.trim().is_empty() {
            errors.push("receiver_address_base and receiver_key_identifier are required".to_string());
        }

        if self.funding.max_attempts == 0 {
            errors.push("funding.max_attempts must be > 0".to_string());
        }
        if self.funding.sender_max_attempts == 0 {
            errors.push("funding.sender_max_attempts must be > 0".to_string());
        }
        if self.dispatch.sign_attempts == 0 {
            errors.push("dispatch.sign_attempts must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
