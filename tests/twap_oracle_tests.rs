//! End-to-end oracle tests against in-memory pools

#[cfg(test)]
mod tests {
    use ethers::types::{Address, U256};
    use std::sync::{Arc, Mutex};
    use twap_oracle::oracle::sources::InMemoryPools;
    use twap_oracle::oracle::twap::{self, Q112};
    use twap_oracle::oracle::{
        LogNotifier, OracleConfig, OracleError, OracleParams, TaskNotifier, TaskSubmission,
        TwapOracle, TIME_ELAPSED_OUT_OF_RANGE,
    };
    use twap_oracle::types::TokenPath;

    const A: u8 = 0x0a;
    const B: u8 = 0x0b;
    const C: u8 = 0x0c;

    fn token(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn path(tokens: &[u8]) -> TokenPath {
        TokenPath::new(tokens.iter().map(|b| token(*b)).collect())
    }

    fn ether(n: u64) -> U256 {
        U256::exp10(18) * U256::from(n)
    }

    fn oracle(pools: &InMemoryPools) -> TwapOracle<InMemoryPools, LogNotifier> {
        TwapOracle::new(
            OracleParams::default(),
            OracleConfig::new(300, 600),
            pools.clone(),
            LogNotifier,
        )
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        tasks: Arc<Mutex<Vec<TaskSubmission>>>,
    }

    impl TaskNotifier for RecordingNotifier {
        fn notify(&self, task: TaskSubmission) {
            self.tasks.lock().unwrap().push(task);
        }
    }

    // ============================================================================
    // Single hop
    // ============================================================================

    #[tokio::test]
    async fn test_unit_price_over_one_period() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 5_000, 5_000, 0)
            .unwrap();
        let mut oracle = oracle(&pools);

        oracle.exec(1, &path(&[A, B])).await.unwrap();
        pools.sync(pair, 300).unwrap();
        oracle.exec(1, &path(&[A, B])).await.unwrap();

        assert_eq!(oracle.get_price(1, ether(1)).unwrap(), ether(1));
    }

    #[tokio::test]
    async fn test_not_ready_after_single_exec() {
        let pools = InMemoryPools::new();
        pools
            .create_pair(&OracleParams::default(), token(A), token(B), 1, 1, 0)
            .unwrap();
        let mut oracle = oracle(&pools);
        oracle.exec(1, &path(&[A, B])).await.unwrap();

        assert_eq!(
            oracle.get_price(1, ether(1)).unwrap_err(),
            OracleError::NotReady { id: 1, hop: 0 }
        );
    }

    #[tokio::test]
    async fn test_reverse_direction_inverts_price() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 1_000, 4_000, 0)
            .unwrap();
        let mut oracle = oracle(&pools);

        oracle.exec(1, &path(&[A, B])).await.unwrap();
        oracle.exec(2, &path(&[B, A])).await.unwrap();
        pools.sync(pair, 100).unwrap();
        oracle.exec(1, &path(&[A, B])).await.unwrap();
        oracle.exec(2, &path(&[B, A])).await.unwrap();

        assert_eq!(oracle.get_price(1, ether(1)).unwrap(), ether(4));
        assert_eq!(
            oracle.get_price(2, ether(4)).unwrap(),
            ether(1)
        );
    }

    #[tokio::test]
    async fn test_time_weighting_across_reserve_change() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 1_000, 1_000, 0)
            .unwrap();
        let mut oracle = oracle(&pools);
        oracle.exec(1, &path(&[A, B])).await.unwrap();

        // 100s at 1.0, then 200s at 4.0
        pools.update(pair, 1_000, 4_000, 100).unwrap();
        pools.sync(pair, 300).unwrap();
        oracle.exec(1, &path(&[A, B])).await.unwrap();

        assert_eq!(oracle.get_price(1, ether(1)).unwrap(), ether(3));
    }

    // ============================================================================
    // Freshness bounds
    // ============================================================================

    #[tokio::test]
    async fn test_elapsed_equal_to_max_period_is_accepted() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 1, 2, 0)
            .unwrap();
        let mut oracle = oracle(&pools);
        oracle.exec(1, &path(&[A, B])).await.unwrap();
        pools.sync(pair, 600).unwrap();
        oracle.exec(1, &path(&[A, B])).await.unwrap();

        assert_eq!(oracle.get_price(1, ether(1)).unwrap(), ether(2));
    }

    #[tokio::test]
    async fn test_elapsed_beyond_max_period_is_stale() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 1, 2, 0)
            .unwrap();
        let mut oracle = oracle(&pools);
        oracle.exec(1, &path(&[A, B])).await.unwrap();
        pools.sync(pair, 601).unwrap();
        oracle.exec(1, &path(&[A, B])).await.unwrap();

        let err = oracle.get_price(1, ether(1)).unwrap_err();
        assert_eq!(
            err,
            OracleError::StaleOracle {
                elapsed: 601,
                max_period: 600
            }
        );
        assert!(err.to_string().contains(TIME_ELAPSED_OUT_OF_RANGE));
    }

    #[tokio::test]
    async fn test_zero_max_period_disables_quotes() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 1, 1, 0)
            .unwrap();
        let mut oracle = oracle(&pools);
        oracle.exec(1, &path(&[A, B])).await.unwrap();
        pools.sync(pair, 1).unwrap();
        oracle.exec(1, &path(&[A, B])).await.unwrap();
        assert!(oracle.get_price(1, ether(1)).is_ok());

        oracle.set_max_period(0);
        assert!(matches!(
            oracle.get_price(1, ether(1)),
            Err(OracleError::StaleOracle { .. })
        ));
    }

    // ============================================================================
    // Multi hop
    // ============================================================================

    #[tokio::test]
    async fn test_two_hops_compose_like_nested_single_hops() {
        let params = OracleParams::default();
        let pools = InMemoryPools::new();
        let ab = pools
            .create_pair(&params, token(A), token(B), 1_000, 3_000, 0)
            .unwrap();
        let bc = pools
            .create_pair(&params, token(B), token(C), 7_000, 2_000, 0)
            .unwrap();
        let mut oracle = oracle(&pools);

        for (id, tokens) in [(1, &[A, B][..]), (2, &[B, C][..]), (3, &[A, B, C][..])] {
            oracle.exec(id, &path(tokens)).await.unwrap();
        }
        pools.sync(ab, 300).unwrap();
        pools.sync(bc, 300).unwrap();
        for (id, tokens) in [(1, &[A, B][..]), (2, &[B, C][..]), (3, &[A, B, C][..])] {
            oracle.exec(id, &path(tokens)).await.unwrap();
        }

        let amount_in = ether(10);
        let nested = oracle
            .get_price(2, oracle.get_price(1, amount_in).unwrap())
            .unwrap();
        assert_eq!(oracle.get_price(3, amount_in).unwrap(), nested);

        // 10 A -> 30 B -> 30 * 2/7 C, truncated at each hop
        let ratio = twap::encode_ratio(2_000, 7_000).unwrap();
        assert_eq!(nested, twap::quote(ratio, ether(30)).unwrap());
    }

    #[tokio::test]
    async fn test_failed_hop_leaves_record_untouched() {
        let params = OracleParams::default();
        let pools = InMemoryPools::new();
        let ab = pools
            .create_pair(&params, token(A), token(B), 1, 1, 0)
            .unwrap();
        let bc = pools
            .create_pair(&params, token(B), token(C), 1, 1, 0)
            .unwrap();
        let mut oracle = oracle(&pools);
        oracle.exec(1, &path(&[A, B, C])).await.unwrap();
        let before = oracle.store().record(1).unwrap().clone();

        pools.sync(ab, 300).unwrap();
        pools.remove(bc);
        assert_eq!(
            oracle.exec(1, &path(&[A, B, C])).await.unwrap_err(),
            OracleError::PoolUnavailable { pair: bc }
        );
        assert_eq!(oracle.store().record(1).unwrap(), &before);
    }

    #[tokio::test]
    async fn test_path_change_restarts_sampling() {
        let params = OracleParams::default();
        let pools = InMemoryPools::new();
        let ab = pools
            .create_pair(&params, token(A), token(B), 1, 1, 0)
            .unwrap();
        let ac = pools
            .create_pair(&params, token(A), token(C), 1, 1, 0)
            .unwrap();
        let mut oracle = oracle(&pools);

        oracle.exec(1, &path(&[A, B])).await.unwrap();
        pools.sync(ab, 300).unwrap();
        pools.sync(ac, 300).unwrap();
        oracle.exec(1, &path(&[A, C])).await.unwrap();

        assert!(matches!(
            oracle.get_price(1, ether(1)),
            Err(OracleError::NotReady { .. })
        ));
        assert_eq!(oracle.oracles_from_id(1, 0).unwrap().pair_address, ac);
    }

    // ============================================================================
    // Wraparound
    // ============================================================================

    #[tokio::test]
    async fn test_accumulator_and_timestamp_wraparound() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 1, 1, 0)
            .unwrap();
        let start = u32::MAX - 100;
        let near_max = U256::MAX - Q112 * U256::from(50u64);
        pools
            .set_accumulators(pair, near_max, near_max, start)
            .unwrap();

        let mut oracle = oracle(&pools);
        oracle.exec(1, &path(&[A, B])).await.unwrap();
        pools.sync(pair, start.wrapping_add(300)).unwrap();
        oracle.exec(1, &path(&[A, B])).await.unwrap();

        let current = oracle.oracles_from_id(1, 0).unwrap();
        assert!(current.price0_cumulative_last < near_max);
        assert!(current.block_timestamp_last < start);
        assert_eq!(oracle.get_price(1, ether(1)).unwrap(), ether(1));
    }

    // ============================================================================
    // Live consult and reads
    // ============================================================================

    #[tokio::test]
    async fn test_consult_uses_live_pool_without_writing() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 2, 5, 0)
            .unwrap();
        let mut oracle = oracle(&pools);
        oracle.exec(1, &path(&[A, B])).await.unwrap();
        let before = oracle.store().clone();

        pools.sync(pair, 150).unwrap();
        let live = oracle.consult(1, ether(2)).await.unwrap();
        assert_eq!(live, ether(5));
        assert_eq!(oracle.store(), &before);
    }

    #[tokio::test]
    async fn test_oracles_from_id_returns_latest_snapshot() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 1, 1, 0)
            .unwrap();
        let mut oracle = oracle(&pools);

        assert_eq!(
            oracle.oracles_from_id(1, 0).unwrap_err(),
            OracleError::NotInitialized { id: 1 }
        );

        oracle.exec(1, &path(&[A, B])).await.unwrap();
        pools.sync(pair, 42).unwrap();
        oracle.exec(1, &path(&[A, B])).await.unwrap();

        let snapshot = oracle.oracles_from_id(1, 0).unwrap();
        assert_eq!(snapshot.pair_address, pair);
        assert_eq!(snapshot.block_timestamp_last, 42);
        assert_eq!(snapshot.price0_cumulative_last, Q112 * U256::from(42u64));
    }

    #[tokio::test]
    async fn test_invalid_paths_are_rejected() {
        let pools = InMemoryPools::new();
        let mut oracle = oracle(&pools);
        assert!(matches!(
            oracle.exec(1, &path(&[A])).await,
            Err(OracleError::InvalidPath(_))
        ));
        assert!(matches!(
            oracle.exec(1, &path(&[A, A])).await,
            Err(OracleError::InvalidPath(_))
        ));
        assert!(oracle.store().is_empty());
    }

    // ============================================================================
    // Scheduling
    // ============================================================================

    #[test]
    fn test_set_max_period_applies_to_next_query_only() {
        let pools = InMemoryPools::new();
        let pair = pools
            .create_pair(&OracleParams::default(), token(A), token(B), 1, 3, 0)
            .unwrap();
        let mut oracle = oracle(&pools);

        tokio_test::block_on(async {
            oracle.exec(1, &path(&[A, B])).await.unwrap();
            pools.sync(pair, 700).unwrap();
            oracle.exec(1, &path(&[A, B])).await.unwrap();
        });
        tokio_test::assert_err!(oracle.get_price(1, ether(1)));

        oracle.set_max_period(700);
        let amount_out = tokio_test::assert_ok!(oracle.get_price(1, ether(1)));
        assert_eq!(amount_out, ether(3));
    }

    #[test]
    fn test_schedule_start_is_repeatable() {
        let notifier = RecordingNotifier::default();
        let oracle = TwapOracle::new(
            OracleParams::default(),
            OracleConfig::new(300, 600),
            InMemoryPools::new(),
            notifier.clone(),
        );

        let first = oracle.schedule_start(5, 86_400, 1_700_000_000).unwrap();
        let second = oracle.schedule_start(5, 86_400, 1_700_000_000).unwrap();
        assert_eq!(first, 1_700_000_000 + 86_400 - 300);
        assert_eq!(first, second);

        let tasks = notifier.tasks.lock().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0], tasks[1]);
        assert_eq!(
            tasks[0],
            TaskSubmission {
                id: 5,
                start_oracle_time: first
            }
        );
    }

    #[test]
    fn test_period_change_moves_start_time() {
        let notifier = RecordingNotifier::default();
        let mut oracle = TwapOracle::new(
            OracleParams::default(),
            OracleConfig::new(300, 600),
            InMemoryPools::new(),
            notifier.clone(),
        );
        oracle.set_period(900);
        assert_eq!(oracle.schedule_start(1, 3_600, 0).unwrap(), 2_700);
        assert_eq!(
            oracle.schedule_start(1, 600, 0).unwrap_err(),
            OracleError::InvalidSchedule {
                delay: 600,
                period: 900
            }
        );
        assert_eq!(notifier.tasks.lock().unwrap().len(), 1);
    }
}
