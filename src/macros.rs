/// Runs `$code` and records its wall time in the `$metric` histogram.
/// Early returns out of the block are recorded too.
#[macro_export]
macro_rules! measure_block {
    ($metric:expr, $code:block) => {{
        let timer = $metric.start_timer();
        let result = $code;
        timer.observe_duration();
        result
    }};
}

#[macro_export]
macro_rules! measure {
    ($metric:expr, $code:block) => {
        $crate::measure_block!($metric, $code)
    };
}
