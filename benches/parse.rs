use divan::Bencher;
use nestml::parser::parse_string;
use nestml::{CompilerContext, LoggingLevel, ModelParser};

fn main() {
    divan::main();
}

fn setup(n: usize) -> String {
    format!(
        "
        neuron bench {{
            parameters {{
                {}
                tau ms = 10 ms
            }}
            state {{
                V_m mV = 0 mV
            }}
            equations {{
                V_m' = -(V_m - ({})) / tau
            }}
            update {{
                integrate_odes()
            }}
        }}
        ",
        (0..n)
            .map(|i| format!("p{} mV = {} mV", i, i))
            .collect::<Vec<_>>()
            .join("\n"),
        (0..n)
            .map(|i| format!("p{}", i))
            .collect::<Vec<_>>()
            .join(" + "),
    )
}

#[divan::bench(consts = [1, 10, 100, 1000])]
fn parse_only<const N: usize>(bencher: Bencher) {
    let text = setup(N);
    bencher.bench_local(|| parse_string(&text).unwrap());
}

#[divan::bench(consts = [1, 10, 100, 1000])]
fn parse_and_check<const N: usize>(bencher: Bencher) {
    let text = setup(N);
    let context = CompilerContext::initialized(LoggingLevel::Error);
    bencher.bench_local(|| {
        let mut context = context.fork();
        ModelParser::new(&mut context).parse_model_str(&text).unwrap()
    });
}
