//! Instruction text sent alongside the document.

use chrono::NaiveDate;

/// Build the instruction prompt for one document.
///
/// `issued_on` is the liquidation base date quoted to the model; the
/// user's free-text instructions and employer percentage are appended
/// verbatim.
pub fn build_prompt(instructions: &str, employer_percent: f64, issued_on: NaiveDate) -> String {
    let base_date = issued_on.format("%d/%m/%Y");
    let instructions = instructions.trim();
    let instructions = if instructions.is_empty() {
        "nenhuma"
    } else {
        instructions
    };

    format!(
        "\
### LIQUIDAÇÃO DE SENTENÇA TRABALHISTA
Atue como perito contábil do juízo. Trabalhe apenas com o que o documento comprova.

### REGRAS DE PROCESSAMENTO
1. Liste TODOS os pedidos do documento, do primeiro ao último item (alíneas \"a\" em diante), sem pular nenhum.
2. Cada rubrica deve trazer o campo detalhamentoMensal preenchido:
   - verbas rescisórias: uma linha na competência da rescisão;
   - verbas mensais: uma linha por mês do período contratual;
   - explicite base, quantidade e adicionais usados.
3. Quando a petição indicar o valor de um pedido, use-o como principal nominal daquela rubrica.
4. Encargos:
   - INSS do empregado pela tabela progressiva vigente;
   - IRRF pela sistemática de rendimentos recebidos acumuladamente;
   - correção e juros pela SELIC (ADC 58 do STF), data-base {base_date}.
5. Se o cálculo não for possível, marque isCalculationPossible como false e explique em errorReason.

ORIENTAÇÕES DO USUÁRIO: {instructions}
INSS PATRONAL: {employer_percent}%
"
    )
}
