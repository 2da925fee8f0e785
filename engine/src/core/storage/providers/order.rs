use crate::core::{
    error::EngineError,
    storage::{composite_key, Backend, Column, KvStorage},
};
use async_trait::async_trait;
use log::trace;
use mlm_common::{
    amount::Amount,
    participant::ParticipantId,
    sale::{OrderId, OrderRecord},
};

#[async_trait]
pub trait OrderProvider {
    async fn has_order(&self, order_id: OrderId) -> Result<bool, EngineError>;

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>, EngineError>;

    /// Store an approved sale and index it under its buyer
    async fn add_order(&mut self, order: &OrderRecord) -> Result<(), EngineError>;

    async fn get_orders_by_buyer(
        &self,
        buyer: ParticipantId,
    ) -> Result<Vec<OrderRecord>, EngineError>;

    /// Sum of every recorded order of the buyer
    async fn get_lifetime_purchases(&self, buyer: ParticipantId) -> Result<Amount, EngineError> {
        Ok(self
            .get_orders_by_buyer(buyer)
            .await?
            .iter()
            .fold(0, |total: Amount, order| total.saturating_add(order.amount)))
    }
}

#[async_trait]
impl<B: Backend> OrderProvider for KvStorage<B> {
    async fn has_order(&self, order_id: OrderId) -> Result<bool, EngineError> {
        trace!("has order {}", order_id);
        self.contains_data(Column::Orders, &order_id.to_be_bytes())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>, EngineError> {
        trace!("get order {}", order_id);
        self.load_optional_from_disk(Column::Orders, &order_id.to_be_bytes())
    }

    async fn add_order(&mut self, order: &OrderRecord) -> Result<(), EngineError> {
        trace!("add order {} of {}", order.order_id, order.buyer);
        self.insert_into_disk(Column::Orders, &order.order_id.to_be_bytes(), order)?;
        self.insert_into_disk(
            Column::OrdersByBuyer,
            &composite_key(order.buyer, order.order_id),
            order,
        )
    }

    async fn get_orders_by_buyer(
        &self,
        buyer: ParticipantId,
    ) -> Result<Vec<OrderRecord>, EngineError> {
        trace!("get orders of {}", buyer);
        self.scan_prefix(Column::OrdersByBuyer, &buyer.to_be_bytes())
    }
}
