pub mod admin;
pub mod coupons;
pub mod loyalty;
pub mod orders;
pub mod payments;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    coupons::CouponService, inventory::InventoryClient, loyalty::LoyaltyService,
    orders::OrderService, payments::GatewayClient, payments::PaymentService,
    returns::ReturnService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub returns: ReturnService,
    pub loyalty: LoyaltyService,
    pub coupons: CouponService,
    pub payments: Arc<PaymentService>,
}

impl AppServices {
    pub fn new(
        db: DbPool,
        config: &AppConfig,
        inventory: Arc<dyn InventoryClient>,
        gateway: Arc<dyn GatewayClient>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        let policy = config.policy.clone();

        let coupons = CouponService::new(db.clone());
        let loyalty = LoyaltyService::new(
            db.clone(),
            policy.loyalty_cycle_stamps,
            event_sender.clone(),
        );
        let orders = OrderService::new(
            db.clone(),
            policy.clone(),
            coupons.clone(),
            loyalty.clone(),
            inventory,
            event_sender.clone(),
        );
        let returns = ReturnService::new(db, policy.clone(), event_sender);
        let payments = Arc::new(PaymentService::new(
            gateway,
            &config.gateway,
            policy.currency,
        ));

        Self {
            orders,
            returns,
            loyalty,
            coupons,
            payments,
        }
    }
}
