//! Integration tests for the order/cart pipeline.
//!
//! Tests: Service → unit of work → store transaction → stock counters
//!
//! Verifies:
//! - Order placement is all-or-nothing across lines
//! - Stock never goes negative, including under concurrent placement
//! - Deleting an order restores exactly what placing it took
//! - A lost conditional decrement surfaces as `ConcurrentStockChange` and rolls back

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use proptest::prelude::*;

    use storefront_cart::{AddItem, CartItem, CartLine};
    use storefront_catalog::{NewReview, Product, Review};
    use storefront_core::{
        CartId, DomainError, Money, OrderId, OrderLineId, ProductId, Quantity, ReviewId, UserId,
    };
    use storefront_orders::{Order, OrderLine, OrderLineRequest, OrderLineView, OrderStatus};

    use crate::accounts::{Accounts, NewUser};
    use crate::cart_ledger::CartLedger;
    use crate::error::ServiceError;
    use crate::order_engine::OrderEngine;
    use crate::store::{InMemoryStore, Storage, StoreError, StoreResult, StoreTx};

    struct Shop {
        store: InMemoryStore,
        orders: OrderEngine,
        cart: CartLedger,
        user: UserId,
    }

    async fn setup() -> Shop {
        let store = InMemoryStore::new();
        let shared: Arc<dyn Storage> = Arc::new(store.clone());
        let user = Accounts::new(shared.clone())
            .create_user(NewUser::new("buyer", "buyer@example.com", "hash").unwrap())
            .await
            .unwrap();
        Shop {
            orders: OrderEngine::new(shared.clone()),
            cart: CartLedger::new(shared),
            store,
            user,
        }
    }

    async fn product(shop: &Shop, stock: i32, price: &str) -> ProductId {
        shop.store
            .seed_product("Item", Some("test item"), price.parse().unwrap(), stock)
            .await
            .unwrap()
    }

    fn line(product_id: ProductId, quantity: i64, price: &str) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity: Quantity::new(quantity).unwrap(),
            price: price.parse().unwrap(),
        }
    }

    async fn stock(shop: &Shop, id: ProductId) -> i32 {
        shop.store.get_stock(id).await.unwrap().unwrap()
    }

    fn domain(err: ServiceError) -> DomainError {
        match err {
            ServiceError::Domain(e) => e,
            other => panic!("expected a domain error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_line_rolls_back_earlier_lines() {
        let shop = setup().await;
        let p1 = product(&shop, 10, "5.00").await;
        let p2 = product(&shop, 3, "1.00").await;

        let err = shop
            .orders
            .place_order(shop.user, vec![line(p1, 2, "5.00"), line(p2, 1_000_000, "1.00")])
            .await
            .unwrap_err();

        assert_eq!(
            domain(err),
            DomainError::InsufficientStock {
                product_id: p2,
                available: 3,
                requested: 1_000_000
            }
        );
        assert_eq!(stock(&shop, p1).await, 10);
        assert_eq!(stock(&shop, p2).await, 3);
        assert!(shop.orders.get_orders_by_user(shop.user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn place_then_delete_restores_stock_exactly() {
        let shop = setup().await;
        let p1 = product(&shop, 7, "9.99").await;

        let order_id = shop
            .orders
            .place_order(shop.user, vec![line(p1, 1, "9.99")])
            .await
            .unwrap();
        assert_eq!(stock(&shop, p1).await, 6);

        let order = shop.orders.get_order(order_id).await.unwrap();
        assert_eq!(order.total, Money::from_cents(999));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.lines.len(), 1);

        shop.orders.delete_order(order_id).await.unwrap();
        assert_eq!(stock(&shop, p1).await, 7);
        assert!(matches!(
            domain(shop.orders.get_order(order_id).await.unwrap_err()),
            DomainError::NotFound { entity: "order", .. }
        ));
    }

    #[tokio::test]
    async fn draining_stock_then_ordering_again_is_out_of_stock() {
        let shop = setup().await;
        let p = product(&shop, 5, "2.50").await;

        shop.orders
            .place_order(shop.user, vec![line(p, 5, "2.50")])
            .await
            .unwrap();
        assert_eq!(stock(&shop, p).await, 0);

        let err = shop
            .orders
            .place_order(shop.user, vec![line(p, 1, "2.50")])
            .await
            .unwrap_err();
        assert_eq!(
            domain(err),
            DomainError::OutOfStock {
                product_id: p,
                available: 0,
                requested: 1
            }
        );
    }

    #[tokio::test]
    async fn multi_line_order_shares_one_order_id() {
        let shop = setup().await;
        let p1 = product(&shop, 5, "1.00").await;
        let p2 = product(&shop, 5, "2.00").await;

        let order_id = shop
            .orders
            .place_order(shop.user, vec![line(p2, 2, "2.00"), line(p1, 1, "1.00")])
            .await
            .unwrap();

        let views = shop.orders.get_orders_by_user(shop.user).await.unwrap();
        assert_eq!(views.len(), 2);
        assert!(views.iter().all(|v| v.order_id == order_id));
        assert_eq!(views[0].product_id, p2);
        assert_eq!(views[1].product_id, p1);
        assert_eq!(
            shop.orders.get_order(order_id).await.unwrap().total,
            Money::from_cents(500)
        );
    }

    #[tokio::test]
    async fn invalid_requests_have_no_store_effect() {
        let shop = setup().await;
        let p = product(&shop, 5, "1.00").await;

        let err = shop.orders.place_order(shop.user, Vec::new()).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidArgument(_)));

        let err = shop
            .orders
            .place_order(UserId::new(4242), vec![line(p, 1, "1.00")])
            .await
            .unwrap_err();
        assert!(matches!(
            domain(err),
            DomainError::NotFound { entity: "user", .. }
        ));

        let err = shop
            .orders
            .place_order(
                shop.user,
                vec![line(p, 1, "1.00"), line(ProductId::new(999), 1, "1.00")],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            domain(err),
            DomainError::NotFound { entity: "product", .. }
        ));

        assert_eq!(stock(&shop, p).await, 5);
        assert!(shop.orders.get_orders_by_user(shop.user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_updates_accept_any_value() {
        let shop = setup().await;
        let p = product(&shop, 5, "1.00").await;
        let order_id = shop
            .orders
            .place_order(shop.user, vec![line(p, 1, "1.00")])
            .await
            .unwrap();

        shop.orders
            .update_status(order_id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(
            shop.orders.get_order(order_id).await.unwrap().status,
            OrderStatus::Shipped
        );

        shop.orders
            .update_status(order_id, OrderStatus::from("on_hold"))
            .await
            .unwrap();
        let views = shop.orders.get_orders_by_user(shop.user).await.unwrap();
        assert_eq!(views[0].status.as_str(), "on_hold");

        let err = shop
            .orders
            .update_status(OrderId::new(999), OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn deleting_unknown_order_is_not_found() {
        let shop = setup().await;
        let err = shop.orders.delete_order(OrderId::new(31)).await.unwrap_err();
        assert!(matches!(
            domain(err),
            DomainError::NotFound { entity: "order", .. }
        ));
    }

    #[tokio::test]
    async fn checkout_moves_cart_into_an_order() {
        let shop = setup().await;
        let p1 = product(&shop, 10, "4.00").await;
        let p2 = product(&shop, 10, "1.50").await;

        shop.cart.add_item(shop.user, p1, 2).await.unwrap();
        shop.cart.add_item(shop.user, p2, 3).await.unwrap();

        let order_id = shop.orders.checkout(shop.user).await.unwrap();

        let order = shop.orders.get_order(order_id).await.unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total, Money::from_cents(1250));
        assert_eq!(stock(&shop, p1).await, 8);
        assert_eq!(stock(&shop, p2).await, 7);
        assert!(shop.cart.get_cart(shop.user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn checkout_shortage_leaves_cart_and_stock_untouched() {
        let shop = setup().await;
        let p1 = product(&shop, 10, "4.00").await;
        let p2 = product(&shop, 1, "1.50").await;

        shop.cart.add_item(shop.user, p1, 2).await.unwrap();
        shop.cart.add_item(shop.user, p2, 3).await.unwrap();

        let err = shop.orders.checkout(shop.user).await.unwrap_err();
        assert!(matches!(
            domain(err),
            DomainError::InsufficientStock { .. }
        ));
        assert_eq!(stock(&shop, p1).await, 10);
        assert_eq!(stock(&shop, p2).await, 1);
        assert_eq!(shop.cart.get_cart(shop.user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn checkout_of_empty_cart_is_invalid() {
        let shop = setup().await;
        let err = shop.orders.checkout(shop.user).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidArgument(_)));

        let err = shop.orders.checkout(UserId::new(77)).await.unwrap_err();
        assert!(matches!(domain(err), DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn cart_writes_wait_for_an_open_checkout() {
        let shop = setup().await;
        let a = product(&shop, 10, "2.00").await;
        let b = product(&shop, 10, "3.00").await;
        shop.cart.add_item(shop.user, a, 1).await.unwrap();

        let mut tx = shop.store.begin().await.unwrap();
        let cart_id = tx.cart_for_user(shop.user).await.unwrap().unwrap();
        let read = tx.checkout_lines(cart_id).await.unwrap();
        assert_eq!(read.len(), 1);

        let new_line = tokio::spawn({
            let cart = shop.cart.clone();
            let user = shop.user;
            async move { cart.add_item(user, b, 2).await }
        });
        let merge = tokio::spawn({
            let cart = shop.cart.clone();
            let user = shop.user;
            async move { cart.add_item(user, a, 3).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!new_line.is_finished());
        assert!(!merge.is_finished());

        assert_eq!(tx.clear_cart(cart_id).await.unwrap(), 1);
        tx.commit().await.unwrap();
        new_line.await.unwrap().unwrap();
        merge.await.unwrap().unwrap();

        let mut cart: Vec<_> = shop
            .cart
            .get_cart(shop.user)
            .await
            .unwrap()
            .into_iter()
            .map(|l| (l.product_id, l.quantity.get()))
            .collect();
        cart.sort();
        assert_eq!(cart, vec![(a, 3), (b, 2)]);
    }

    #[tokio::test]
    async fn prices_beyond_the_stored_range_are_invalid() {
        let shop = setup().await;
        let p = product(&shop, 5, "1.00").await;

        let err = shop
            .orders
            .place_order(shop.user, vec![line(p, 1, "100000000.00")])
            .await
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidArgument(_)));

        let err = shop
            .orders
            .place_order(shop.user, vec![line(p, 2, "99999999.99")])
            .await
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::InvalidArgument(_)));
        assert_eq!(stock(&shop, p).await, 5);

        shop.orders
            .place_order(shop.user, vec![line(p, 1, "99999999.99")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicate_registration_is_invalid_and_creates_nothing() {
        let shop = setup().await;
        let accounts = Accounts::new(Arc::new(shop.store.clone()));

        let err = accounts
            .create_user(NewUser::new("buyer", "other@example.com", "h").unwrap())
            .await
            .unwrap_err();
        assert_eq!(
            domain(err),
            DomainError::invalid("username or email already registered")
        );

        let second = accounts
            .create_user(NewUser::new("second", "second@example.com", "h").unwrap())
            .await
            .unwrap();
        assert!(shop.cart.get_cart(second).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_orders_for_last_unit_admit_exactly_one() {
        let shop = setup().await;
        let p = product(&shop, 1, "3.00").await;
        let engine = shop.orders.clone();
        let user = shop.user;

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.place_order(user, vec![line(p, 1, "3.00")]).await }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.place_order(user, vec![line(p, 1, "3.00")]).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let failure = results.into_iter().find_map(Result::err).unwrap();
        assert!(failure.is_stock_shortage(), "unexpected error: {failure}");
        assert_eq!(stock(&shop, p).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_concurrent_orders_never_oversell() {
        let shop = setup().await;
        let p = product(&shop, 10, "1.00").await;

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let engine = shop.orders.clone();
                let user = shop.user;
                tokio::spawn(async move { engine.place_order(user, vec![line(p, 1, "1.00")]).await })
            })
            .collect();

        let mut placed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(err) => assert!(err.is_stock_shortage(), "unexpected error: {err}"),
            }
        }
        assert_eq!(placed, 10);
        assert_eq!(stock(&shop, p).await, 0);
    }

    // Scripted store: reads report plenty of stock, but every conditional
    // decrement affects zero rows, as if another writer got there first.

    #[derive(Default)]
    struct Script {
        calls: Mutex<Vec<&'static str>>,
        fail_rollback: bool,
    }

    impl Script {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct RacingStore(Arc<Script>);

    struct RacingTx(Arc<Script>);

    fn unscripted<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable("not scripted".to_string()))
    }

    #[async_trait]
    impl Storage for RacingStore {
        async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
            self.0.record("begin");
            Ok(Box::new(RacingTx(self.0.clone())))
        }
        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
        async fn list_products(&self) -> StoreResult<Vec<Product>> {
            unscripted()
        }
        async fn get_product(&self, _: ProductId) -> StoreResult<Option<Product>> {
            unscripted()
        }
        async fn get_stock(&self, _: ProductId) -> StoreResult<Option<i32>> {
            unscripted()
        }
        async fn reviews_for_product(&self, _: ProductId) -> StoreResult<Vec<Review>> {
            unscripted()
        }
        async fn insert_review(&self, _: &NewReview) -> StoreResult<ReviewId> {
            unscripted()
        }
        async fn user_exists(&self, _: UserId) -> StoreResult<bool> {
            Ok(true)
        }
        async fn cart_for_user(&self, _: UserId) -> StoreResult<Option<CartId>> {
            unscripted()
        }
        async fn cart_lines(&self, _: CartId) -> StoreResult<Vec<CartLine>> {
            unscripted()
        }
        async fn upsert_cart_item(&self, _: CartId, _: &AddItem) -> StoreResult<CartItem> {
            unscripted()
        }
        async fn delete_cart_item(&self, _: CartId, _: ProductId) -> StoreResult<u64> {
            unscripted()
        }
        async fn clear_cart(&self, _: CartId) -> StoreResult<u64> {
            unscripted()
        }
        async fn orders_for_user(&self, _: UserId) -> StoreResult<Vec<OrderLineView>> {
            unscripted()
        }
        async fn get_order(&self, _: OrderId) -> StoreResult<Option<Order>> {
            unscripted()
        }
        async fn update_order_status(&self, _: OrderId, _: &OrderStatus) -> StoreResult<u64> {
            unscripted()
        }
    }

    #[async_trait]
    impl StoreTx for RacingTx {
        async fn read_stock(&mut self, _: ProductId) -> StoreResult<Option<i32>> {
            self.0.record("read_stock");
            Ok(Some(100))
        }
        async fn try_decrement_stock(&mut self, _: ProductId, _: Quantity) -> StoreResult<u64> {
            self.0.record("try_decrement_stock");
            Ok(0)
        }
        async fn increment_stock(&mut self, _: ProductId, _: Quantity) -> StoreResult<u64> {
            unscripted()
        }
        async fn user_exists(&mut self, _: UserId) -> StoreResult<bool> {
            Ok(true)
        }
        async fn insert_order(&mut self, _: UserId, _: Money) -> StoreResult<OrderId> {
            self.0.record("insert_order");
            Ok(OrderId::new(1))
        }
        async fn insert_order_line(
            &mut self,
            _: OrderId,
            _: &OrderLineRequest,
        ) -> StoreResult<OrderLineId> {
            self.0.record("insert_order_line");
            Ok(OrderLineId::new(1))
        }
        async fn order_lines(&mut self, _: OrderId) -> StoreResult<Vec<OrderLine>> {
            unscripted()
        }
        async fn delete_order(&mut self, _: OrderId) -> StoreResult<u64> {
            unscripted()
        }
        async fn cart_for_user(&mut self, _: UserId) -> StoreResult<Option<CartId>> {
            unscripted()
        }
        async fn checkout_lines(&mut self, _: CartId) -> StoreResult<Vec<OrderLineRequest>> {
            unscripted()
        }
        async fn clear_cart(&mut self, _: CartId) -> StoreResult<u64> {
            unscripted()
        }
        async fn insert_user(&mut self, _: &NewUser) -> StoreResult<UserId> {
            unscripted()
        }
        async fn insert_cart(&mut self, _: UserId) -> StoreResult<CartId> {
            unscripted()
        }
        async fn commit(self: Box<Self>) -> StoreResult<()> {
            self.0.record("commit");
            Ok(())
        }
        async fn rollback(self: Box<Self>) -> StoreResult<()> {
            self.0.record("rollback");
            if self.0.fail_rollback {
                Err(StoreError::Unavailable("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn lost_conditional_decrement_is_a_concurrent_change_and_rolls_back() {
        let script = Arc::new(Script::default());
        let engine = OrderEngine::new(Arc::new(RacingStore(script.clone())));

        let err = engine
            .place_order(UserId::new(1), vec![line(ProductId::new(8), 2, "1.00")])
            .await
            .unwrap_err();

        assert_eq!(
            domain(err),
            DomainError::ConcurrentStockChange {
                product_id: ProductId::new(8),
                requested: 2
            }
        );
        assert_eq!(
            script.calls(),
            vec![
                "begin",
                "insert_order",
                "read_stock",
                "try_decrement_stock",
                "rollback"
            ]
        );
    }

    #[tokio::test]
    async fn failed_rollback_does_not_mask_the_original_error() {
        storefront_observability::init_with_default("warn");
        let script = Arc::new(Script {
            fail_rollback: true,
            ..Script::default()
        });
        let engine = OrderEngine::new(Arc::new(RacingStore(script.clone())));

        let err = engine
            .place_order(UserId::new(1), vec![line(ProductId::new(8), 1, "1.00")])
            .await
            .unwrap_err();

        assert!(matches!(
            domain(err),
            DomainError::ConcurrentStockChange { .. }
        ));
        assert!(!script.calls().contains(&"commit"));
    }

    // Stock invariant over random place/delete sequences.

    #[derive(Debug, Clone)]
    enum Op {
        Place(Vec<(usize, i64)>),
        Delete(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => prop::collection::vec((0usize..3, 1i64..8), 1..4).prop_map(Op::Place),
            1 => (0usize..16).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: stock stays within [0, initial] after every step, and
        /// stock plus the quantities held by live orders equals the initial stock.
        #[test]
        fn stock_is_conserved_across_place_and_delete(
            initial in prop::collection::vec(0i32..12, 3),
            ops in prop::collection::vec(op_strategy(), 1..25),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            rt.block_on(async {
                let shop = setup().await;
                let mut products = Vec::new();
                for &s in &initial {
                    products.push(product(&shop, s, "1.00").await);
                }
                let mut live: Vec<(OrderId, Vec<(usize, i64)>)> = Vec::new();

                for op in ops {
                    match op {
                        Op::Place(lines) => {
                            let request = lines
                                .iter()
                                .map(|&(idx, q)| line(products[idx], q, "1.00"))
                                .collect();
                            match shop.orders.place_order(shop.user, request).await {
                                Ok(id) => live.push((id, lines)),
                                Err(err) => assert!(err.is_stock_shortage(), "{err}"),
                            }
                        }
                        Op::Delete(n) => {
                            if !live.is_empty() {
                                let (id, _) = live.remove(n % live.len());
                                shop.orders.delete_order(id).await.unwrap();
                            }
                        }
                    }

                    for (idx, &id) in products.iter().enumerate() {
                        let now = stock(&shop, id).await;
                        let held: i64 = live
                            .iter()
                            .flat_map(|(_, lines)| lines.iter())
                            .filter(|(i, _)| *i == idx)
                            .map(|(_, q)| q)
                            .sum();
                        assert!(now >= 0);
                        assert!(now <= initial[idx]);
                        assert_eq!(i64::from(now) + held, i64::from(initial[idx]));
                    }
                }
            });
        }
    }
}
